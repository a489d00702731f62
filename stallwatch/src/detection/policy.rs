//! Detection policy: which states count as blocking, and how long a run must be

use crate::domain::ThreadState;
use std::collections::BTreeSet;

/// A run shorter than this is never chronic, whatever the policy says.
pub const MIN_CHRONIC_RUN: usize = 2;

/// Default for [`DetectionPolicy::min_occurrences`].
pub const DEFAULT_MIN_OCCURRENCES: usize = 2;

/// How many consecutive blocking-like snapshots make a run chronic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChronicThreshold {
    /// Blocking-like in every snapshot of the input.
    #[default]
    AllSnapshots,
    /// At least this many consecutive snapshots (raised to [`MIN_CHRONIC_RUN`]).
    Runs(usize),
}

impl ChronicThreshold {
    /// Concrete run length for an input of `snapshot_count` snapshots.
    #[must_use]
    pub fn resolve(self, snapshot_count: usize) -> usize {
        match self {
            ChronicThreshold::AllSnapshots => snapshot_count.max(MIN_CHRONIC_RUN),
            ChronicThreshold::Runs(n) => n.max(MIN_CHRONIC_RUN),
        }
    }
}

/// Caller-supplied configuration for [`detect`](super::detect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionPolicy {
    /// States treated as stalled progress. `Unknown` never counts, even if listed.
    pub blocking_states: BTreeSet<ThreadState>,
    /// Names seen in fewer snapshots than this are ignored.
    pub min_occurrences: usize,
    pub chronic_threshold: ChronicThreshold,
    /// Only report threads whose last observed stack contains application frames.
    pub application_only: bool,
    /// Package prefix identifying application frames (`com.example`).
    pub app_package: Option<String>,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            blocking_states: default_blocking_states(),
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
            chronic_threshold: ChronicThreshold::AllSnapshots,
            application_only: false,
            app_package: None,
        }
    }
}

impl DetectionPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_blocking_states(mut self, states: impl IntoIterator<Item = ThreadState>) -> Self {
        self.blocking_states = states.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_min_occurrences(mut self, min_occurrences: usize) -> Self {
        self.min_occurrences = min_occurrences;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: ChronicThreshold) -> Self {
        self.chronic_threshold = threshold;
        self
    }

    #[must_use]
    pub fn application_only(mut self, app_package: Option<String>) -> Self {
        self.application_only = true;
        self.app_package = app_package;
        self
    }

    #[must_use]
    pub fn is_blocking(&self, state: ThreadState) -> bool {
        state != ThreadState::Unknown && self.blocking_states.contains(&state)
    }
}

/// `{Blocked, Waiting, TimedWaiting}`
#[must_use]
pub fn default_blocking_states() -> BTreeSet<ThreadState> {
    [ThreadState::Blocked, ThreadState::Waiting, ThreadState::TimedWaiting].into_iter().collect()
}
