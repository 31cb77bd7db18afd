pub mod config;
pub mod error;
pub mod raft;

pub use config::NodeConfig;
pub use error::{RaftError, Result};
pub use raft::{Cluster, NodeRpc, RaftNode, RaftRole};
