use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use tokio::sync::Mutex;

use crate::config::NodeConfig;
use crate::error::{RaftError, Result};
use crate::raft::cluster::Cluster;
use crate::raft::log::{InMemoryLog, ReplicatedLog};
use crate::raft::rpc::{
    AppendEntriesRequest, AppendEntriesResponse, NodeRpc, VoteRequest, VoteResponse,
};
use crate::raft::state::{RaftRole, RoleMachine};
use crate::raft::timer::{random_election_timeout, PeriodicTimer};

/// Everything the protocol mutates on a node, behind one lock. The four
/// drivers (election tick, heartbeat tick, and the two inbound RPC
/// handlers) are mutually exclusive on this state; the outbound fan-outs
/// release the lock while waiting on peers and revalidate on re-entry.
struct NodeState {
    current_term: u64,
    voted_for: Option<u64>,
    role: RoleMachine,
    stopped: bool,
    cluster: Option<Cluster>,
    log: Box<dyn ReplicatedLog>,
}

#[derive(Clone, Copy)]
enum Tick {
    Election,
    Heartbeat,
}

/// One participant in the cluster. Called "server" in the Raft paper;
/// node is more accurate since several can share a process.
///
/// A node owns two timers: the election timer runs while it is a
/// follower or candidate, the heartbeat timer only while it leads. At
/// most one of the two drives the node at any moment. Construction
/// spawns the timer tasks and therefore needs a tokio runtime.
pub struct RaftNode {
    id: u64,
    config: NodeConfig,
    shared: Mutex<NodeState>,
    election_timer: PeriodicTimer,
    heartbeat_timer: PeriodicTimer,
}

impl RaftNode {
    /// Ids start at 0 for the first node and increment from there.
    pub fn new(id: u64, config: NodeConfig) -> Arc<Self> {
        Self::new_with_log(id, config, Box::new(InMemoryLog::new()))
    }

    /// Construct with an injected replicated-log collaborator.
    pub fn new_with_log(
        id: u64,
        config: NodeConfig,
        log: Box<dyn ReplicatedLog>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<RaftNode>| {
            let base = config.election_timeout_base_ms;
            let jitter = config.election_timeout_jitter_ms;
            let election_timer = {
                let weak = weak.clone();
                PeriodicTimer::spawn(
                    move || random_election_timeout(base, jitter),
                    move || Self::drive_tick(weak.clone(), Tick::Election),
                )
            };

            let heartbeat_ms = config.heartbeat_interval_ms;
            let heartbeat_timer = {
                let weak = weak.clone();
                PeriodicTimer::spawn(
                    move || Duration::from_millis(heartbeat_ms),
                    move || Self::drive_tick(weak.clone(), Tick::Heartbeat),
                )
            };

            Self {
                id,
                config,
                shared: Mutex::new(NodeState {
                    current_term: 0,
                    voted_for: None,
                    role: RoleMachine::new(),
                    // halted until a cluster view is supplied; an
                    // unstarted node neither votes nor times out
                    stopped: true,
                    cluster: None,
                    log,
                }),
                election_timer,
                heartbeat_timer,
            }
        })
    }

    /// Timer entry point. A tick error is an invariant breach (a timer
    /// fired in a role that should have disarmed it); the node must not
    /// keep running in that state.
    async fn drive_tick(weak: Weak<RaftNode>, tick: Tick) {
        let Some(node) = weak.upgrade() else {
            return;
        };
        let result = match tick {
            Tick::Election => node.election_tick().await,
            Tick::Heartbeat => node.heartbeat_tick().await,
        };
        if let Err(err) = result {
            panic!("node {}: {err}", node.id);
        }
    }

    /// Supplies the cluster view and arms the election timer.
    pub async fn start(&self, cluster: Cluster) {
        let mut state = self.shared.lock().await;
        state.stopped = false;
        state.cluster = Some(cluster);
        self.election_timer.reset();
        tracing::info!(node_id = self.id, "Node started");
    }

    /// Disarms both timers and forces the node back to follower. Used by
    /// orchestration and tests to simulate a crash; a racing timer fire
    /// observes `stopped` and no-ops.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.shared.lock().await;
        state.stopped = true;
        self.heartbeat_timer.stop();
        self.election_timer.stop();
        if state.role.current() != RaftRole::Follower {
            state.role.transition(RaftRole::Follower)?;
        }
        tracing::info!(node_id = self.id, "Node stopped");
        Ok(())
    }

    /// One election cycle: become candidate in a fresh term, fan out
    /// vote requests to every peer, wait for all of them, then tally.
    /// Driven by the election timer; public so orchestration and tests
    /// can force a cycle deterministically.
    pub async fn election_tick(&self) -> Result<()> {
        let mut state = self.shared.lock().await;
        if state.stopped {
            return Ok(());
        }
        if state.role.current() == RaftRole::Leader {
            // the election timer must never be armed while leading
            return Err(RaftError::UnexpectedTimeout {
                timer: "election",
                node_id: self.id,
                role: RaftRole::Leader,
            });
        }
        let cluster = state.cluster.clone().ok_or(RaftError::NoCluster(self.id))?;

        state.current_term += 1;
        state.role.transition(RaftRole::Candidate)?;
        state.voted_for = Some(self.id); // candidate votes for itself first
        let term = state.current_term;
        tracing::info!(node_id = self.id, term, "Election timeout, requesting votes");
        drop(state);

        let req = VoteRequest {
            term,
            candidate_id: self.id,
            // log position hints, pending replicated-log integration
            last_log_index: 0,
            last_log_term: 0,
        };
        let calls = cluster.remote_peers(self.id).into_iter().map(|(peer_id, rpc)| {
            let req = req.clone();
            async move { (peer_id, rpc.request_vote(req).await) }
        });
        let replies = future::join_all(calls).await;

        let mut granted = 1usize; // self vote
        let mut highest_term = term;
        for (peer_id, reply) in replies {
            match reply {
                Ok(resp) => {
                    if resp.term > highest_term {
                        highest_term = resp.term;
                    }
                    if resp.vote_granted {
                        granted += 1;
                        tracing::debug!(node_id = self.id, peer_id, votes = granted, "Vote received");
                    }
                }
                Err(err) => {
                    // unreachable peer counts as a non-grant
                    tracing::warn!(node_id = self.id, peer_id, error = %err, "Vote request failed");
                }
            }
        }

        let mut state = self.shared.lock().await;
        // another driver may have overtaken this cycle while the lock
        // was released; its outcome is then discarded
        if state.stopped || state.current_term != term || state.role.current() != RaftRole::Candidate
        {
            tracing::debug!(node_id = self.id, term, "Election cycle overtaken, result discarded");
            return Ok(());
        }

        if self.config.demote_on_stale_term && highest_term > term {
            state.current_term = highest_term;
            state.voted_for = None;
            state.role.transition(RaftRole::Follower)?;
            self.election_timer.reset();
            tracing::info!(
                node_id = self.id,
                term = highest_term,
                "Higher term observed during election, stepping down"
            );
            return Ok(());
        }

        if granted >= cluster.quorum() {
            state.role.transition(RaftRole::Leader)?;
            self.election_timer.stop();
            self.heartbeat_timer.reset();
            tracing::info!(node_id = self.id, term, votes = granted, "Election won, acting as leader");
        } else {
            // split vote or unreachable cluster: retry after a fresh
            // randomized timeout rather than immediately
            state.role.transition(RaftRole::Follower)?;
            self.election_timer.reset();
            tracing::info!(
                node_id = self.id,
                term,
                votes = granted,
                needed = cluster.quorum(),
                "Election lost, waiting for next timeout"
            );
        }
        Ok(())
    }

    /// One heartbeat round: empty AppendEntries to every peer, wait for
    /// all replies. A reply with a greater term means this node has been
    /// superseded and steps down. Driven by the heartbeat timer.
    pub async fn heartbeat_tick(&self) -> Result<()> {
        let mut state = self.shared.lock().await;
        if state.stopped {
            return Ok(());
        }
        let role = state.role.current();
        if role != RaftRole::Leader {
            return Err(RaftError::UnexpectedTimeout {
                timer: "heartbeat",
                node_id: self.id,
                role,
            });
        }
        let cluster = state.cluster.clone().ok_or(RaftError::NoCluster(self.id))?;
        let term = state.current_term;
        drop(state);

        tracing::debug!(node_id = self.id, term, "Sending heartbeats");
        let calls = cluster.remote_peers(self.id).into_iter().map(|(peer_id, rpc)| {
            let req = AppendEntriesRequest::heartbeat(term, self.id);
            async move { (peer_id, rpc.append_entries(req).await) }
        });
        let replies = future::join_all(calls).await;

        let mut highest_term = term;
        for (peer_id, reply) in replies {
            match reply {
                Ok(resp) if resp.term > highest_term => highest_term = resp.term,
                Ok(_) => {}
                Err(err) => {
                    // no retry within this round, the next tick covers it
                    tracing::trace!(node_id = self.id, peer_id, error = %err, "Heartbeat failed");
                }
            }
        }

        if highest_term > term {
            let mut state = self.shared.lock().await;
            // a stalled round may complete after this node was demoted
            // and re-elected at a higher term; its replies are stale
            // and must not touch the new incarnation
            if state.stopped
                || state.current_term != term
                || state.role.current() != RaftRole::Leader
            {
                tracing::debug!(node_id = self.id, term, "Heartbeat cycle overtaken, result discarded");
                return Ok(());
            }
            state.current_term = highest_term;
            state.voted_for = None;
            self.switch_to_follower(&mut state)?;
            tracing::info!(
                node_id = self.id,
                term = highest_term,
                "Superseded by higher term, stepping down"
            );
        }
        Ok(())
    }

    /// Inbound RequestVote handler.
    pub async fn request_vote(&self, req: VoteRequest) -> Result<VoteResponse> {
        let mut state = self.shared.lock().await;
        if state.stopped {
            // stopped nodes do not vote
            return Ok(VoteResponse {
                term: state.current_term,
                vote_granted: false,
            });
        }

        // any contact from a term-bearing peer postpones our own
        // timeout, vote granted or not
        self.election_timer.reset();

        if req.term < state.current_term {
            return Ok(VoteResponse {
                term: state.current_term,
                vote_granted: false,
            });
        }
        if state.voted_for.is_some() && req.term == state.current_term {
            // one vote per term
            return Ok(VoteResponse {
                term: state.current_term,
                vote_granted: false,
            });
        }
        if req.term > state.current_term {
            state.current_term = req.term;
            state.voted_for = None;
            self.switch_to_follower(&mut state)?;
        }

        state.voted_for = Some(req.candidate_id);
        tracing::debug!(
            node_id = self.id,
            candidate = req.candidate_id,
            term = state.current_term,
            "Vote granted"
        );
        Ok(VoteResponse {
            term: state.current_term,
            vote_granted: true,
        })
    }

    /// Inbound AppendEntries handler: heartbeat and log replication.
    pub async fn append_entries(
        &self,
        req: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse> {
        let mut state = self.shared.lock().await;
        if state.stopped {
            return Ok(AppendEntriesResponse {
                term: state.current_term,
                success: false,
            });
        }
        if req.term < state.current_term {
            // stale leader
            return Ok(AppendEntriesResponse {
                term: state.current_term,
                success: false,
            });
        }
        if req.term > state.current_term {
            state.current_term = req.term;
            state.voted_for = None;
            if state.role.current() != RaftRole::Follower {
                // the term update is the useful side effect; this call
                // itself is not yet validated against the log
                self.switch_to_follower(&mut state)?;
                return Ok(AppendEntriesResponse {
                    term: state.current_term,
                    success: false,
                });
            }
        }

        if req.entries.is_empty() {
            tracing::debug!(
                node_id = self.id,
                leader = req.leader_id,
                "Heartbeat received, resetting election timer"
            );
            self.election_timer.reset();
            return Ok(AppendEntriesResponse {
                term: state.current_term,
                success: true,
            });
        }

        let success = state.log.append(
            req.prev_log_index,
            req.prev_log_term,
            &req.entries,
            req.leader_commit,
        );
        tracing::debug!(
            node_id = self.id,
            leader = req.leader_id,
            entries = req.entries.len(),
            success,
            "Entries delegated to replicated log"
        );
        Ok(AppendEntriesResponse {
            term: state.current_term,
            success,
        })
    }

    /// Demotes a leader or candidate; a follower stays put. Leaving the
    /// leader role disarms the heartbeat timer.
    fn switch_to_follower(&self, state: &mut NodeState) -> Result<()> {
        match state.role.current() {
            RaftRole::Leader => {
                self.heartbeat_timer.stop();
                state.role.transition(RaftRole::Follower)
            }
            RaftRole::Candidate => state.role.transition(RaftRole::Follower),
            RaftRole::Follower => Ok(()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn role(&self) -> RaftRole {
        self.shared.lock().await.role.current()
    }

    pub async fn current_term(&self) -> u64 {
        self.shared.lock().await.current_term
    }

    pub async fn voted_for(&self) -> Option<u64> {
        self.shared.lock().await.voted_for
    }

    pub async fn is_leader(&self) -> bool {
        self.role().await == RaftRole::Leader
    }

    pub fn election_timer_armed(&self) -> bool {
        self.election_timer.is_armed()
    }

    pub fn heartbeat_timer_armed(&self) -> bool {
        self.heartbeat_timer.is_armed()
    }
}

#[async_trait]
impl NodeRpc for RaftNode {
    async fn request_vote(&self, req: VoteRequest) -> Result<VoteResponse> {
        RaftNode::request_vote(self, req).await
    }

    async fn append_entries(&self, req: AppendEntriesRequest) -> Result<AppendEntriesResponse> {
        RaftNode::append_entries(self, req).await
    }
}
