pub mod cluster;
pub mod log;
pub mod node;
pub mod rpc;
pub mod state;
pub mod timer;

pub use cluster::Cluster;
pub use log::{InMemoryLog, LogEntry, ReplicatedLog};
pub use node::RaftNode;
pub use rpc::{
    AppendEntriesRequest, AppendEntriesResponse, NodeRpc, VoteRequest, VoteResponse,
};
pub use state::{RaftRole, RoleMachine};
pub use timer::PeriodicTimer;
