//! Bookkeeping for subprocesses the orchestrator has spawned or suspended.
//!
//! The registry is the single source of truth consumed by shutdown cleanup:
//! every PID it holds is terminated when the orchestrator exits, whether the
//! process was running or sitting in a suspended state at the time. It is
//! owned by the orchestration loop and passed down by `&mut`; there is no
//! global state and, in this single-threaded design, no locking.

use std::collections::HashSet;

/// Tracks the PIDs currently running or paused under the orchestrator.
///
/// Invariant: a PID is in at most one of the two sets at any time.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    running: HashSet<u32>,
    paused: HashSet<u32>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pid` as running, clearing any paused membership.
    pub fn mark_running(&mut self, pid: u32) {
        self.paused.remove(&pid);
        self.running.insert(pid);
    }

    /// Record `pid` as paused, clearing any running membership.
    pub fn mark_paused(&mut self, pid: u32) {
        self.running.remove(&pid);
        self.paused.insert(pid);
    }

    /// Drop `pid` from both sets. Idempotent: removing an untracked PID is
    /// a no-op.
    pub fn remove(&mut self, pid: u32) {
        self.running.remove(&pid);
        self.paused.remove(&pid);
    }

    pub fn is_paused(&self, pid: u32) -> bool {
        self.paused.contains(&pid)
    }

    pub fn is_running(&self, pid: u32) -> bool {
        self.running.contains(&pid)
    }

    /// All tracked PIDs, running and paused alike.
    pub fn all(&self) -> Vec<u32> {
        self.running.union(&self.paused).copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty() && self.paused.is_empty()
    }

    pub fn clear(&mut self) {
        self.running.clear();
        self.paused.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_and_paused_stay_disjoint() {
        let mut reg = ProcessRegistry::new();
        reg.mark_running(42);
        assert!(reg.is_running(42));
        reg.mark_paused(42);
        assert!(reg.is_paused(42));
        assert!(!reg.is_running(42));
        reg.mark_running(42);
        assert!(reg.is_running(42));
        assert!(!reg.is_paused(42));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = ProcessRegistry::new();
        reg.mark_running(7);
        reg.remove(7);
        reg.remove(7);
        assert!(reg.is_empty());
    }

    #[test]
    fn all_covers_both_sets() {
        let mut reg = ProcessRegistry::new();
        reg.mark_running(1);
        reg.mark_paused(2);
        let mut pids = reg.all();
        pids.sort_unstable();
        assert_eq!(pids, vec![1, 2]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut reg = ProcessRegistry::new();
        reg.mark_running(1);
        reg.mark_paused(2);
        reg.clear();
        assert!(reg.is_empty());
    }
}
