use std::sync::Arc;

use crate::raft::rpc::NodeRpc;

/// The fixed set of cluster members, injected into a node at start.
///
/// Each member is an id paired with the RPC capability used to reach it.
/// The view also answers the quorum question: a majority counted over
/// the whole cluster, the local node included.
#[derive(Clone, Default)]
pub struct Cluster {
    nodes: Vec<(u64, Arc<dyn NodeRpc>)>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, node_id: u64, rpc: Arc<dyn NodeRpc>) -> Self {
        self.nodes.push((node_id, rpc));
        self
    }

    /// Total cluster size, self included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Minimum number of grants or acks for a cluster-wide decision.
    pub fn quorum(&self) -> usize {
        self.nodes.len() / 2 + 1
    }

    /// Handles of every member except `excluding_id`, in insertion order.
    pub fn remote_peers(&self, excluding_id: u64) -> Vec<(u64, Arc<dyn NodeRpc>)> {
        self.nodes
            .iter()
            .filter(|(id, _)| *id != excluding_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RaftError, Result};
    use crate::raft::rpc::{
        AppendEntriesRequest, AppendEntriesResponse, VoteRequest, VoteResponse,
    };
    use async_trait::async_trait;

    struct DeadPeer;

    #[async_trait]
    impl NodeRpc for DeadPeer {
        async fn request_vote(&self, _req: VoteRequest) -> Result<VoteResponse> {
            Err(RaftError::PeerUnreachable {
                peer_id: 0,
                reason: "dead".into(),
            })
        }

        async fn append_entries(
            &self,
            _req: AppendEntriesRequest,
        ) -> Result<AppendEntriesResponse> {
            Err(RaftError::PeerUnreachable {
                peer_id: 0,
                reason: "dead".into(),
            })
        }
    }

    fn cluster_of(n: u64) -> Cluster {
        (0..n).fold(Cluster::new(), |c, id| c.add_node(id, Arc::new(DeadPeer)))
    }

    #[test]
    fn quorum_is_floor_half_plus_one() {
        assert_eq!(cluster_of(1).quorum(), 1);
        assert_eq!(cluster_of(2).quorum(), 2);
        assert_eq!(cluster_of(3).quorum(), 2);
        assert_eq!(cluster_of(4).quorum(), 3);
        assert_eq!(cluster_of(5).quorum(), 3);
    }

    #[test]
    fn remote_peers_excludes_self() {
        let cluster = cluster_of(3);
        let peers = cluster.remote_peers(1);
        let ids: Vec<u64> = peers.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn single_node_cluster_has_no_peers() {
        let cluster = cluster_of(1);
        assert!(cluster.remote_peers(0).is_empty());
        assert_eq!(cluster.len(), 1);
    }
}
