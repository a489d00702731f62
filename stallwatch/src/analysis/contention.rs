//! Lock contention analysis for thread dumps.
//!
//! Groups threads by the lock they are waiting on, so the monitors with the
//! longest queues surface first, together with whoever holds them.
//!
//! # Architecture
//!
//! - **`analyze_contention()`** - Batch analysis of a single `Snapshot`
//! - **`ContentionStats`** - Aggregation across a series of snapshots, to
//!   tell a lock that is contended in every dump from a one-off queue
//!
//! This is a queue summary, not deadlock proof: no wait-for cycles are
//! resolved.

use crate::domain::{LockRef, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Maximum distinct waiter names kept per lock across a series.
///
/// Large pools can queue hundreds of workers on one lock; a handful of names
/// is enough to recognise the pool.
const MAX_WAITER_NAMES_PER_LOCK: usize = 8;

// =============================================================================
// SINGLE-SNAPSHOT CONTENTION
// =============================================================================

/// One lock with at least one waiter in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockContention {
    pub lock: LockRef,
    /// Threads listing the lock under `- locked`, excluding the waiters
    /// themselves (`Object.wait()` prints the monitor it released as locked).
    pub owners: Vec<String>,
    /// Waiting threads in dump order.
    pub waiters: Vec<String>,
}

/// Summarise which locks threads are queued on in one snapshot.
///
/// Sorted by waiter count (descending), then lock id.
#[must_use]
pub fn analyze_contention(snapshot: &Snapshot) -> Vec<LockContention> {
    let mut by_lock: HashMap<&str, (&LockRef, Vec<String>)> = HashMap::new();

    for thread in &snapshot.threads {
        if let Some(lock) = &thread.waiting_on {
            by_lock
                .entry(lock.id.as_str())
                .or_insert_with(|| (lock, Vec::new()))
                .1
                .push(thread.name.clone());
        }
    }

    let mut contention: Vec<LockContention> = by_lock
        .into_values()
        .map(|(lock, waiters)| {
            let owners = snapshot
                .threads
                .iter()
                .filter(|t| t.holds(lock) && t.waiting_on.as_ref() != Some(lock))
                .map(|t| t.name.clone())
                .collect();
            LockContention { lock: lock.clone(), owners, waiters }
        })
        .collect();

    contention.sort_by(|a, b| {
        b.waiters.len().cmp(&a.waiters.len()).then_with(|| a.lock.id.cmp(&b.lock.id))
    });
    contention
}

// =============================================================================
// CONTENTION STATS (AGGREGATOR)
// =============================================================================

/// A lock's contention history over a snapshot series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHotspot {
    pub lock: LockRef,
    /// Snapshots in which at least one thread waited on the lock.
    pub snapshots_contended: usize,
    /// Largest waiter count seen in a single snapshot.
    pub peak_waiters: usize,
    /// Owners seen across the series.
    pub owners: BTreeSet<String>,
    /// Up to `MAX_WAITER_NAMES_PER_LOCK` waiter names.
    pub sample_waiters: BTreeSet<String>,
}

/// Accumulates [`LockContention`] across snapshots, one call per snapshot.
#[derive(Debug, Default)]
pub struct ContentionStats {
    locks: HashMap<String, LockHotspot>,
    snapshots: usize,
}

impl ContentionStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one snapshot into the statistics.
    pub fn record_snapshot(&mut self, snapshot: &Snapshot) {
        self.snapshots += 1;

        for entry in analyze_contention(snapshot) {
            let stats = self.locks.entry(entry.lock.id.clone()).or_insert_with(|| LockHotspot {
                lock: entry.lock.clone(),
                snapshots_contended: 0,
                peak_waiters: 0,
                owners: BTreeSet::new(),
                sample_waiters: BTreeSet::new(),
            });

            stats.snapshots_contended += 1;
            stats.peak_waiters = stats.peak_waiters.max(entry.waiters.len());
            stats.owners.extend(entry.owners);
            for waiter in entry.waiters {
                if stats.sample_waiters.len() >= MAX_WAITER_NAMES_PER_LOCK {
                    break;
                }
                stats.sample_waiters.insert(waiter);
            }
        }
    }

    #[must_use]
    pub fn snapshots_recorded(&self) -> usize {
        self.snapshots
    }

    /// Locks sorted by how many snapshots they were contended in, then by
    /// peak queue length, then id.
    #[must_use]
    pub fn to_hotspots(&self) -> Vec<LockHotspot> {
        let mut hotspots: Vec<LockHotspot> = self.locks.values().cloned().collect();
        hotspots.sort_by(|a, b| {
            b.snapshots_contended
                .cmp(&a.snapshots_contended)
                .then_with(|| b.peak_waiters.cmp(&a.peak_waiters))
                .then_with(|| a.lock.id.cmp(&b.lock.id))
        });
        hotspots
    }
}
