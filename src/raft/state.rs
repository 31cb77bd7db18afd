use crate::error::{RaftError, Result};

/// Raft node role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaftRole {
    Follower,
    Candidate,
    Leader,
}

impl std::fmt::Display for RaftRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaftRole::Follower => write!(f, "follower"),
            RaftRole::Candidate => write!(f, "candidate"),
            RaftRole::Leader => write!(f, "leader"),
        }
    }
}

/// Guards the role field so only legal role changes ever happen.
///
/// Legal transitions: follower -> candidate; candidate -> follower,
/// candidate, or leader; leader -> follower. Anything else is a bug in
/// the driving logic and comes back as `RaftError::IllegalTransition`.
#[derive(Debug)]
pub struct RoleMachine {
    current: RaftRole,
}

impl RoleMachine {
    pub fn new() -> Self {
        Self {
            current: RaftRole::Follower,
        }
    }

    pub fn current(&self) -> RaftRole {
        self.current
    }

    pub fn transition(&mut self, next: RaftRole) -> Result<()> {
        use RaftRole::*;
        let legal = matches!(
            (self.current, next),
            (Follower, Candidate)
                | (Candidate, Follower)
                | (Candidate, Candidate)
                | (Candidate, Leader)
                | (Leader, Follower)
        );
        if !legal {
            return Err(RaftError::IllegalTransition {
                from: self.current,
                to: next,
            });
        }
        self.current = next;
        Ok(())
    }
}

impl Default for RoleMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_as_follower() {
        let roles = RoleMachine::new();
        assert_eq!(roles.current(), RaftRole::Follower);
    }

    #[test]
    fn full_election_cycle() {
        let mut roles = RoleMachine::new();
        roles.transition(RaftRole::Candidate).unwrap();
        roles.transition(RaftRole::Leader).unwrap();
        roles.transition(RaftRole::Follower).unwrap();
        assert_eq!(roles.current(), RaftRole::Follower);
    }

    #[test]
    fn candidate_may_retry_or_step_down() {
        let mut roles = RoleMachine::new();
        roles.transition(RaftRole::Candidate).unwrap();
        roles.transition(RaftRole::Candidate).unwrap();
        roles.transition(RaftRole::Follower).unwrap();
        assert_eq!(roles.current(), RaftRole::Follower);
    }

    #[test]
    fn follower_cannot_jump_to_leader() {
        let mut roles = RoleMachine::new();
        let err = roles.transition(RaftRole::Leader).unwrap_err();
        assert!(matches!(
            err,
            RaftError::IllegalTransition {
                from: RaftRole::Follower,
                to: RaftRole::Leader,
            }
        ));
        // state unchanged after a rejected transition
        assert_eq!(roles.current(), RaftRole::Follower);
    }

    #[test]
    fn leader_cannot_become_candidate() {
        let mut roles = RoleMachine::new();
        roles.transition(RaftRole::Candidate).unwrap();
        roles.transition(RaftRole::Leader).unwrap();
        assert!(roles.transition(RaftRole::Candidate).is_err());
        assert_eq!(roles.current(), RaftRole::Leader);
    }

    #[test]
    fn follower_to_follower_is_illegal() {
        let mut roles = RoleMachine::new();
        assert!(roles.transition(RaftRole::Follower).is_err());
    }

    #[test]
    fn role_display() {
        assert_eq!(RaftRole::Follower.to_string(), "follower");
        assert_eq!(RaftRole::Candidate.to_string(), "candidate");
        assert_eq!(RaftRole::Leader.to_string(), "leader");
    }
}
