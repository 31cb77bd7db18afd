//! RPC surface a node exposes to its peers: the two message pairs of the
//! protocol, and the capability trait a cluster view hands out for
//! reaching a remote node. Wire encoding and connection management are a
//! transport concern and live outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::raft::log::LogEntry;

/// Sent by a candidate to gather votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub term: u64,
    pub candidate_id: u64,
    /// Log position hints, unused until the replicated log participates
    /// in vote restriction.
    pub last_log_index: u64,
    pub last_log_term: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub term: u64,
    pub vote_granted: bool,
}

/// Sent by a leader; doubles as the heartbeat when `entries` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendEntriesRequest {
    pub term: u64,
    pub leader_id: u64,
    pub prev_log_index: u64,
    pub prev_log_term: u64,
    pub entries: Vec<LogEntry>,
    pub leader_commit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendEntriesResponse {
    pub term: u64,
    pub success: bool,
}

impl AppendEntriesRequest {
    /// An empty AppendEntries asserting leadership for `term`.
    pub fn heartbeat(term: u64, leader_id: u64) -> Self {
        Self {
            term,
            leader_id,
            prev_log_index: 0,
            prev_log_term: 0,
            entries: Vec::new(),
            leader_commit: 0,
        }
    }
}

/// A handle to one remote node. An `Err` from either call means the peer
/// was unreachable; election and heartbeat cycles absorb that as a
/// non-grant or an ignored reply, never as a hard failure.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn request_vote(&self, req: VoteRequest) -> Result<VoteResponse>;
    async fn append_entries(&self, req: AppendEntriesRequest) -> Result<AppendEntriesResponse>;
}
