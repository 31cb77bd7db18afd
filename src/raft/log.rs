use serde::{Deserialize, Serialize};

/// A single entry in the replicated log (1-indexed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub term: u64,
    pub index: u64,
    pub command: String,
}

/// The replicated-log collaborator a node delegates to when an
/// AppendEntries call carries actual entries. Consistency checking,
/// conflict resolution, and commit-index advancement are its business;
/// the consensus node only forwards the leader's parameters and relays
/// the success bit back to the caller.
pub trait ReplicatedLog: Send {
    /// Consistency-check against the previous-entry hint, then append.
    /// Returns false when the log does not contain a matching entry at
    /// `prev_log_index`.
    fn append(
        &mut self,
        prev_log_index: u64,
        prev_log_term: u64,
        entries: &[LogEntry],
        leader_commit: u64,
    ) -> bool;

    fn last_index(&self) -> u64;
    fn last_term(&self) -> u64;
    fn commit_index(&self) -> u64;
}

/// Volatile in-memory log, the default collaborator. Would be backed by
/// stable storage in a production deployment.
#[derive(Debug, Default)]
pub struct InMemoryLog {
    entries: Vec<LogEntry>,
    commit_index: u64,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry at `index` (1-indexed), if present.
    fn entry_at(&self, index: u64) -> Option<&LogEntry> {
        if index == 0 {
            return None;
        }
        self.entries.get((index - 1) as usize)
    }
}

impl ReplicatedLog for InMemoryLog {
    fn append(
        &mut self,
        prev_log_index: u64,
        prev_log_term: u64,
        entries: &[LogEntry],
        leader_commit: u64,
    ) -> bool {
        if prev_log_index > 0 {
            match self.entry_at(prev_log_index) {
                None => return false,
                Some(prev) if prev.term != prev_log_term => {
                    // conflicting suffix, truncate and let the leader retry
                    self.entries.truncate((prev_log_index - 1) as usize);
                    return false;
                }
                Some(_) => {}
            }
        }

        // drop anything after the agreement point, then take the
        // leader's entries as authoritative
        self.entries.truncate(prev_log_index as usize);
        self.entries.extend_from_slice(entries);

        if leader_commit > self.commit_index {
            self.commit_index = leader_commit.min(self.last_index());
        }
        true
    }

    fn last_index(&self) -> u64 {
        self.entries.last().map(|e| e.index).unwrap_or(0)
    }

    fn last_term(&self) -> u64 {
        self.entries.last().map(|e| e.term).unwrap_or(0)
    }

    fn commit_index(&self) -> u64 {
        self.commit_index
    }
}
