/// Timing and behavior knobs for a single consensus node.
///
/// The defaults mirror a deliberately slow demo cluster: election
/// timeouts of 2000ms plus up to 1000ms of jitter, heartbeats every
/// 1000ms. The heartbeat interval must stay below the election timeout
/// minimum so a healthy leader always preempts follower timeouts.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Fixed lower bound of the election timeout.
    pub election_timeout_base_ms: u64,
    /// Width of the uniform jitter window added on top of the base.
    /// Jitter reduces the chance that two followers time out together
    /// and split the vote.
    pub election_timeout_jitter_ms: u64,
    /// Fixed heartbeat interval used while leading.
    pub heartbeat_interval_ms: u64,
    /// When a peer's vote reply carries a term greater than the
    /// candidate's own, adopt it and revert to follower before the
    /// votes are tallied. Off by default: the stock behavior ignores
    /// the higher term until the next inbound RPC delivers it.
    pub demote_on_stale_term: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            election_timeout_base_ms: 2000,
            election_timeout_jitter_ms: 1000,
            heartbeat_interval_ms: 1000,
            demote_on_stale_term: false,
        }
    }
}

impl NodeConfig {
    pub fn with_election_timeout(mut self, base_ms: u64, jitter_ms: u64) -> Self {
        self.election_timeout_base_ms = base_ms;
        self.election_timeout_jitter_ms = jitter_ms;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval_ms: u64) -> Self {
        self.heartbeat_interval_ms = interval_ms;
        self
    }

    pub fn with_demote_on_stale_term(mut self, enabled: bool) -> Self {
        self.demote_on_stale_term = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.election_timeout_base_ms, 2000);
        assert_eq!(cfg.election_timeout_jitter_ms, 1000);
        assert_eq!(cfg.heartbeat_interval_ms, 1000);
        assert!(!cfg.demote_on_stale_term);
    }

    #[test]
    fn heartbeat_below_election_minimum() {
        let cfg = NodeConfig::default();
        assert!(cfg.heartbeat_interval_ms < cfg.election_timeout_base_ms);
    }

    #[test]
    fn builder_helpers() {
        let cfg = NodeConfig::default()
            .with_election_timeout(150, 150)
            .with_heartbeat_interval(50)
            .with_demote_on_stale_term(true);
        assert_eq!(cfg.election_timeout_base_ms, 150);
        assert_eq!(cfg.election_timeout_jitter_ms, 150);
        assert_eq!(cfg.heartbeat_interval_ms, 50);
        assert!(cfg.demote_on_stale_term);
    }
}
