//! Chronic block detection across an ordered series of snapshots.
//!
//! # Algorithm
//!
//! 1. Correlate threads across snapshots by display name. Ids are
//!    dump-local and get reused, names survive for long-lived threads.
//! 2. Lay each name out as a timeline with one slot per snapshot. A slot is
//!    empty when the name is absent from that snapshot.
//! 3. Split the timeline into maximal runs of present, blocking-like slots.
//!    Absence and non-blocking states (including `Unknown`) break a run.
//! 4. Flag the name when its longest run reaches the policy threshold.
//!
//! ```text
//! snapshot     0    1    2    3    4
//! worker-1     B    B    R    B    B      runs: #0..=#1, #3..=#4
//! worker-2     W    -    W    W    W      runs: #0..=#0, #2..=#4
//! main         R    R    R    R    R      runs: none
//! ```
//!
//! # Performance
//!
//! O(snapshots × threads) to build timelines, O(names × snapshots) to scan.

use super::policy::DetectionPolicy;
use crate::classification::{classify_thread, ThreadCategory};
use crate::domain::{ChronicBlockEntry, DetectError, Snapshot, SnapshotWindow, ThreadRecord};
use log::{debug, info};
use std::collections::BTreeMap;

/// Fewer snapshots than this cannot show sustained behaviour.
pub const MIN_SNAPSHOTS: usize = 2;

/// One name's presence in one snapshot.
#[derive(Debug, Clone, Copy)]
struct Observation<'a> {
    /// Every record carrying the name was blocking-like.
    blocking: bool,
    /// Last record with the name, in dump order.
    record: &'a ThreadRecord,
}

type Timeline<'a> = Vec<Option<Observation<'a>>>;

/// Find threads that stayed blocking-like across a sustained run of
/// consecutive snapshots.
///
/// `snapshots` must already be in chronological order; they are not re-sorted.
/// Results are ordered by run length (longest first), then by name.
///
/// # Errors
/// [`DetectError::InsufficientSnapshots`] when fewer than two snapshots are given.
pub fn detect(
    snapshots: &[Snapshot],
    policy: &DetectionPolicy,
) -> Result<Vec<ChronicBlockEntry>, DetectError> {
    if snapshots.len() < MIN_SNAPSHOTS {
        return Err(DetectError::InsufficientSnapshots { provided: snapshots.len() });
    }

    let threshold = policy.chronic_threshold.resolve(snapshots.len());
    let timelines = build_timelines(snapshots, policy);
    debug!(
        "Correlated {} thread names across {} snapshots (threshold {threshold})",
        timelines.len(),
        snapshots.len()
    );

    let mut entries: Vec<ChronicBlockEntry> = timelines
        .into_iter()
        .filter_map(|(name, timeline)| evaluate(name, &timeline, threshold, policy))
        .collect();

    entries.sort_by(|a, b| {
        b.consecutive_blocked_count
            .cmp(&a.consecutive_blocked_count)
            .then_with(|| a.thread_name.cmp(&b.thread_name))
    });

    info!("Flagged {} chronically blocked threads", entries.len());
    Ok(entries)
}

fn build_timelines<'a>(
    snapshots: &'a [Snapshot],
    policy: &DetectionPolicy,
) -> BTreeMap<&'a str, Timeline<'a>> {
    let mut timelines: BTreeMap<&str, Timeline<'a>> = BTreeMap::new();

    for (index, snapshot) in snapshots.iter().enumerate() {
        for record in &snapshot.threads {
            let blocking = policy.is_blocking(record.state);
            let slot = &mut timelines
                .entry(record.name.as_str())
                .or_insert_with(|| vec![None; snapshots.len()])[index];

            *slot = Some(match *slot {
                None => Observation { blocking, record },
                // Same name twice in one dump: blocking only if all of them are
                Some(seen) => Observation { blocking: seen.blocking && blocking, record },
            });
        }
    }

    timelines
}

fn evaluate(
    name: &str,
    timeline: &Timeline<'_>,
    threshold: usize,
    policy: &DetectionPolicy,
) -> Option<ChronicBlockEntry> {
    let occurrences = timeline.iter().flatten().count();
    if occurrences < policy.min_occurrences {
        return None;
    }

    let qualifying: Vec<SnapshotWindow> =
        blocking_runs(timeline).into_iter().filter(|run| run.len() >= threshold).collect();

    // Longest run; `max_by_key` keeps the last maximum, i.e. the most recent
    let window = qualifying.iter().copied().max_by_key(SnapshotWindow::len)?;
    let last = timeline[window.end]?.record;

    if policy.application_only
        && classify_thread(&last.stack, policy.app_package.as_deref()) != ThreadCategory::Application
    {
        debug!("Skipping '{name}': no application frames");
        return None;
    }

    Some(ChronicBlockEntry {
        thread_name: name.to_string(),
        consecutive_blocked_count: window.len(),
        window_snapshot_indices: window,
        qualifying_runs: qualifying,
        occurrences,
        last_observed_state: last.state,
        last_observed_waiting_on: last.waiting_on.clone(),
        last_observed_stack: last.stack.clone(),
    })
}

/// Maximal runs of present, blocking-like slots, in chronological order.
fn blocking_runs(timeline: &Timeline<'_>) -> Vec<SnapshotWindow> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (index, slot) in timeline.iter().enumerate() {
        let blocking = slot.is_some_and(|obs| obs.blocking);
        match (blocking, start) {
            (true, None) => start = Some(index),
            (false, Some(s)) => {
                runs.push(SnapshotWindow::new(s, index - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(SnapshotWindow::new(s, timeline.len() - 1));
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ChronicThreshold;
    use crate::domain::{LockRef, StackFrame, ThreadState};

    use ThreadState::{Blocked, Runnable, Waiting};

    /// One snapshot per column. `B` blocked, `W` waiting, `T` timed waiting,
    /// `R` runnable, `U` unknown, `-` absent.
    fn series(threads: &[(&str, &str)]) -> Vec<Snapshot> {
        let count = threads.iter().map(|(_, states)| states.len()).max().unwrap_or(0);
        (0..count)
            .map(|i| {
                let records = threads
                    .iter()
                    .filter_map(|(name, states)| {
                        let state = match states.as_bytes()[i] {
                            b'B' => Blocked,
                            b'W' => Waiting,
                            b'T' => ThreadState::TimedWaiting,
                            b'R' => Runnable,
                            b'U' => ThreadState::Unknown,
                            _ => return None,
                        };
                        let frame = format!("com.example.Frame.at{i}(Frame.java:{i})");
                        Some(ThreadRecord::new(*name).with_state(state).with_frames([frame.as_str()]))
                    })
                    .collect();
                Snapshot::new(records)
            })
            .collect()
    }

    #[test]
    fn test_fewer_than_two_snapshots_fails() {
        let policy = DetectionPolicy::default();
        assert_eq!(detect(&[], &policy), Err(DetectError::InsufficientSnapshots { provided: 0 }));

        let one = series(&[("worker-1", "B")]);
        assert_eq!(detect(&one, &policy), Err(DetectError::InsufficientSnapshots { provided: 1 }));
    }

    #[test]
    fn test_blocked_in_every_snapshot_is_flagged() {
        let snapshots = series(&[("worker-1", "BBBBB"), ("main", "RRRRR")]);
        let entries = detect(&snapshots, &DetectionPolicy::default()).unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.thread_name, "worker-1");
        assert_eq!(entry.consecutive_blocked_count, 5);
        assert_eq!(entry.window_snapshot_indices, SnapshotWindow::new(0, 4));
        assert_eq!(entry.occurrences, 5);
        assert_eq!(entry.last_observed_state, Blocked);
        assert_eq!(entry.last_observed_stack, vec![StackFrame::new("com.example.Frame.at4(Frame.java:4)")]);
    }

    #[test]
    fn test_single_runnable_breaks_default_policy() {
        let snapshots = series(&[("worker-1", "BBRBB")]);

        let strict = detect(&snapshots, &DetectionPolicy::default()).unwrap();
        assert!(strict.is_empty());

        let relaxed = DetectionPolicy::new().with_threshold(ChronicThreshold::Runs(2));
        let entries = detect(&snapshots, &relaxed).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].consecutive_blocked_count, 2);
        assert_eq!(entries[0].window_snapshot_indices, SnapshotWindow::new(3, 4));
        assert_eq!(
            entries[0].qualifying_runs,
            vec![SnapshotWindow::new(0, 1), SnapshotWindow::new(3, 4)]
        );
    }

    #[test]
    fn test_single_occurrence_never_flagged() {
        let snapshots = series(&[("one-shot", "--B--")]);

        let lenient = DetectionPolicy::new()
            .with_min_occurrences(0)
            .with_threshold(ChronicThreshold::Runs(1));
        assert!(detect(&snapshots, &lenient).unwrap().is_empty());
        assert!(detect(&snapshots, &DetectionPolicy::default()).unwrap().is_empty());
    }

    #[test]
    fn test_absence_breaks_run() {
        let snapshots = series(&[("worker-1", "BB-BBB")]);

        let policy = DetectionPolicy::new().with_threshold(ChronicThreshold::Runs(3));
        let entries = detect(&snapshots, &policy).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].window_snapshot_indices, SnapshotWindow::new(3, 5));
        assert_eq!(entries[0].occurrences, 5);

        let policy = DetectionPolicy::new().with_threshold(ChronicThreshold::Runs(4));
        assert!(detect(&snapshots, &policy).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_blocking_states_form_one_run() {
        let snapshots = series(&[("poller", "WTB")]);

        let entries = detect(&snapshots, &DetectionPolicy::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].consecutive_blocked_count, 3);

        let blocked_only = DetectionPolicy::new()
            .with_blocking_states([Blocked])
            .with_threshold(ChronicThreshold::Runs(2));
        assert!(detect(&snapshots, &blocked_only).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_state_breaks_run() {
        let snapshots = series(&[("worker-1", "BUB")]);
        let policy = DetectionPolicy::new()
            .with_blocking_states([Blocked, ThreadState::Unknown])
            .with_threshold(ChronicThreshold::Runs(2));

        assert!(detect(&snapshots, &policy).unwrap().is_empty());
    }

    #[test]
    fn test_min_occurrences_filters_names() {
        let snapshots = series(&[("worker-1", "-BB-")]);
        let policy = DetectionPolicy::new().with_threshold(ChronicThreshold::Runs(2));

        assert_eq!(detect(&snapshots, &policy).unwrap().len(), 1);
        assert!(detect(&snapshots, &policy.clone().with_min_occurrences(3)).unwrap().is_empty());
    }

    #[test]
    fn test_ordering_by_run_length_then_name() {
        let snapshots = series(&[("zeta", "BBBR"), ("alpha", "RBBR"), ("beta", "RRWW")]);
        let policy = DetectionPolicy::new().with_threshold(ChronicThreshold::Runs(2));
        let names: Vec<_> = detect(&snapshots, &policy)
            .unwrap()
            .into_iter()
            .map(|e| (e.thread_name, e.consecutive_blocked_count))
            .collect();

        assert_eq!(
            names,
            vec![("zeta".to_string(), 3), ("alpha".to_string(), 2), ("beta".to_string(), 2)]
        );
    }

    #[test]
    fn test_duplicate_names_block_only_when_all_block() {
        let mut snapshots = series(&[("pool", "BBB")]);
        snapshots[1].threads.push(ThreadRecord::new("pool").with_state(Runnable));

        let policy = DetectionPolicy::new().with_threshold(ChronicThreshold::Runs(2));
        assert!(detect(&snapshots, &policy).unwrap().is_empty());
    }

    #[test]
    fn test_last_observation_comes_from_end_of_run() {
        let mut snapshots = series(&[("worker-1", "BBR")]);
        let mut last = ThreadRecord::new("worker-1").with_state(Waiting);
        last.waiting_on = Some(LockRef::new("0xabc"));
        snapshots[1].threads[0] = last;

        let policy = DetectionPolicy::new().with_threshold(ChronicThreshold::Runs(2));
        let entries = detect(&snapshots, &policy).unwrap();

        assert_eq!(entries[0].window_snapshot_indices, SnapshotWindow::new(0, 1));
        assert_eq!(entries[0].last_observed_state, Waiting);
        assert_eq!(entries[0].last_observed_waiting_on, Some(LockRef::new("0xabc")));
        assert!(entries[0].last_observed_stack.is_empty());
    }

    #[test]
    fn test_application_only_filter() {
        let mut snapshots = series(&[("app-worker", "BB"), ("jetty-acceptor", "BB")]);
        for snapshot in &mut snapshots {
            snapshot.threads[1].stack =
                vec![StackFrame::new("org.eclipse.jetty.server.Server.join(Server.java:551)")];
        }

        let all = detect(&snapshots, &DetectionPolicy::default()).unwrap();
        assert_eq!(all.len(), 2);

        let apps = detect(&snapshots, &DetectionPolicy::new().application_only(None)).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].thread_name, "app-worker");

        let other_pkg = DetectionPolicy::new().application_only(Some("org.acme".to_string()));
        assert!(detect(&snapshots, &other_pkg).unwrap().is_empty());
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let snapshots = series(&[("worker-1", "BBB")]);
        let before = snapshots.clone();
        let _ = detect(&snapshots, &DetectionPolicy::default()).unwrap();
        assert_eq!(snapshots, before);
    }
}
