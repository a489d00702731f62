//! Human-readable rendering of snapshots and analysis reports

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::analysis::LockHotspot;
use crate::classification::{classify_frame, classify_thread, is_application_frame, FrameOrigin};
use crate::domain::{ChronicBlockEntry, Snapshot, StackFrame};

/// Frames printed per thread in the analysis report.
const MAX_FRAMES_SHOWN: usize = 5;

/// Everything `stallwatch analyze` produces, in one serializable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub snapshot_count: usize,
    /// Source of each snapshot, in analysis order.
    pub sources: Vec<String>,
    pub chronically_blocked: Vec<ChronicBlockEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lock_hotspots: Vec<LockHotspot>,
}

/// Render one snapshot thread by thread.
///
/// # Errors
/// Propagates write errors.
pub fn render_snapshot<W: Write>(out: &mut W, snapshot: &Snapshot, app_package: Option<&str>) -> io::Result<()> {
    writeln!(out, "--- Thread Dump ---")?;
    if let Some(captured_at) = snapshot.captured_at {
        writeln!(out, "Captured: {captured_at}")?;
    }
    if let Some(runtime) = &snapshot.runtime {
        writeln!(out, "Runtime: {runtime}")?;
    }
    writeln!(out, "Vendor: {}", snapshot.vendor)?;
    writeln!(out, "Threads: {} ({} skipped)", snapshot.threads.len(), snapshot.skipped_count())?;

    let summary: Vec<String> =
        snapshot.state_counts().iter().map(|(state, count)| format!("{state}={count}")).collect();
    writeln!(out, "States: {}", summary.join(" "))?;

    for thread in &snapshot.threads {
        let daemon = if thread.daemon { " daemon" } else { "" };
        writeln!(out, "\n- \"{}\"{daemon}", thread.name)?;
        match &thread.state_detail {
            Some(detail) => writeln!(out, "  State: {} ({detail})", thread.state)?,
            None => writeln!(out, "  State: {}", thread.state)?,
        }
        writeln!(out, "  Category: {:?}", classify_thread(&thread.stack, app_package))?;
        if let Some(lock) = &thread.waiting_on {
            writeln!(out, "  Waiting on: {lock}")?;
        }
        for lock in &thread.held_locks {
            writeln!(out, "  Holds: {lock}")?;
        }
        write_frames(out, &thread.stack, app_package, usize::MAX)?;
    }

    for skipped in &snapshot.skipped {
        writeln!(out, "\nwarning: skipped stanza at line {}: {}", skipped.line, skipped.defect)?;
    }
    Ok(())
}

/// Render the chronic block report and, when present, lock hotspots.
///
/// # Errors
/// Propagates write errors.
pub fn render_report<W: Write>(out: &mut W, report: &AnalysisReport, app_package: Option<&str>) -> io::Result<()> {
    writeln!(out, "--- Analysis Report ---")?;
    writeln!(out, "Analyzed {} thread dumps.", report.snapshot_count)?;

    if report.chronically_blocked.is_empty() {
        writeln!(out, "\nNo chronically blocked threads found.")?;
    } else {
        writeln!(out, "\nFound {} chronically blocked threads:", report.chronically_blocked.len())?;
    }

    for entry in &report.chronically_blocked {
        let window = entry.window_snapshot_indices;
        writeln!(
            out,
            "\n- \"{}\" blocked in {} consecutive dumps ({}, seen in {})",
            entry.thread_name, entry.consecutive_blocked_count, window, entry.occurrences
        )?;
        if let (Some(first), Some(last)) = (report.sources.get(window.start), report.sources.get(window.end)) {
            writeln!(out, "  Dumps: {first} .. {last}")?;
        }
        if entry.qualifying_runs.len() > 1 {
            writeln!(out, "  Qualifying runs: {}", entry.qualifying_runs.len())?;
        }
        writeln!(out, "  Last state: {}", entry.last_observed_state)?;
        if let Some(lock) = &entry.last_observed_waiting_on {
            writeln!(out, "  Waiting on: {lock}")?;
        }
        write_frames(out, &entry.last_observed_stack, app_package, MAX_FRAMES_SHOWN)?;
    }

    if !report.lock_hotspots.is_empty() {
        writeln!(out, "\n--- Lock Hotspots ---")?;
        for hotspot in &report.lock_hotspots {
            writeln!(
                out,
                "\n- {} contended in {}/{} dumps, peak {} waiters",
                hotspot.lock, hotspot.snapshots_contended, report.snapshot_count, hotspot.peak_waiters
            )?;
            if !hotspot.owners.is_empty() {
                let owners: Vec<&str> = hotspot.owners.iter().map(String::as_str).collect();
                writeln!(out, "  Owners: {}", owners.join(", "))?;
            }
            let waiters: Vec<&str> = hotspot.sample_waiters.iter().map(String::as_str).collect();
            writeln!(out, "  Waiters: {}", waiters.join(", "))?;
        }
    }
    Ok(())
}

fn write_frames<W: Write>(
    out: &mut W,
    stack: &[StackFrame],
    app_package: Option<&str>,
    limit: usize,
) -> io::Result<()> {
    if stack.is_empty() {
        return Ok(());
    }
    writeln!(out, "  Stack:")?;
    for frame in stack.iter().take(limit) {
        writeln!(out, "    [{}] {frame}", origin_tag(frame, app_package))?;
    }
    if stack.len() > limit {
        writeln!(out, "    ... {} more", stack.len() - limit)?;
    }
    Ok(())
}

fn origin_tag(frame: &StackFrame, app_package: Option<&str>) -> &'static str {
    let origin = match app_package {
        Some(_) if is_application_frame(frame.as_str(), app_package) => FrameOrigin::Application,
        Some(_) => match classify_frame(frame.as_str()) {
            FrameOrigin::Application => FrameOrigin::Framework,
            other => other,
        },
        None => classify_frame(frame.as_str()),
    };
    match origin {
        FrameOrigin::Application => "app",
        FrameOrigin::Jdk => "jdk",
        FrameOrigin::Framework => "lib",
        FrameOrigin::Unknown => "?",
    }
}
