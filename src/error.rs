use thiserror::Error;

use crate::raft::RaftRole;

#[derive(Error, Debug)]
pub enum RaftError {
    /// A role change outside the legal transition table. This is a bug in
    /// the driving logic, never a network condition; callers must not
    /// continue past it.
    #[error("illegal role transition from {from} to {to}")]
    IllegalTransition { from: RaftRole, to: RaftRole },

    /// A timer fired in a role that should have disarmed it (election
    /// timer while leader, heartbeat timer while not leader).
    #[error("{timer} timer fired while node {node_id} was {role}")]
    UnexpectedTimeout {
        timer: &'static str,
        node_id: u64,
        role: RaftRole,
    },

    /// A tick was driven on a node that was never started with a cluster
    /// view.
    #[error("node {0} has no cluster view, was it started?")]
    NoCluster(u64),

    /// An outbound peer call failed. Absorbed by election and heartbeat
    /// cycles as a non-grant / ignored reply.
    #[error("peer {peer_id} unreachable: {reason}")]
    PeerUnreachable { peer_id: u64, reason: String },
}

pub type Result<T> = std::result::Result<T, RaftError>;
