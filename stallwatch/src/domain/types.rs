//! Snapshot model shared by the dump parser and the chronic block detector
//!
//! Everything here is plain value data: a [`Snapshot`] owns its
//! [`ThreadRecord`]s outright and nothing points back into it, so snapshots
//! can be parsed on any thread and handed to the detector in one batch.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Thread state as reported by the runtime
///
/// Mirrors `java.lang.Thread.State`. Tokens the parser does not recognise
/// map to [`ThreadState::Unknown`] instead of failing the stanza.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadState {
    Runnable,
    Waiting,
    TimedWaiting,
    Blocked,
    New,
    Terminated,
    Unknown,
}

impl ThreadState {
    /// Map a JVM state token (`RUNNABLE`, `TIMED_WAITING`, ...) to a state.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "RUNNABLE" => ThreadState::Runnable,
            "WAITING" => ThreadState::Waiting,
            "TIMED_WAITING" => ThreadState::TimedWaiting,
            "BLOCKED" => ThreadState::Blocked,
            "NEW" => ThreadState::New,
            "TERMINATED" => ThreadState::Terminated,
            _ => ThreadState::Unknown,
        }
    }

    /// The JVM spelling of this state.
    #[must_use]
    pub fn as_token(self) -> &'static str {
        match self {
            ThreadState::Runnable => "RUNNABLE",
            ThreadState::Waiting => "WAITING",
            ThreadState::TimedWaiting => "TIMED_WAITING",
            ThreadState::Blocked => "BLOCKED",
            ThreadState::New => "NEW",
            ThreadState::Terminated => "TERMINATED",
            ThreadState::Unknown => "UNKNOWN",
        }
    }

    /// Whether a thread in this state can be parked on a lock.
    #[must_use]
    pub fn can_wait_on_lock(self) -> bool {
        matches!(self, ThreadState::Blocked | ThreadState::Waiting | ThreadState::TimedWaiting)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for ThreadState {
    type Err = String;

    /// Case-insensitive; accepts `-` in place of `_` (`timed-waiting`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase().replace('-', "_");
        match ThreadState::from_token(&token) {
            ThreadState::Unknown if token != "UNKNOWN" => Err(format!("unknown thread state '{s}'")),
            state => Ok(state),
        }
    }
}

/// A monitor or lock as printed in the dump (`<0x000000076ab62208>`)
///
/// Identity is the printed address; the class name is carried along for
/// display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl LockRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), class_name: None }
    }

    #[must_use]
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

impl PartialEq for LockRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LockRef {}

impl Hash for LockRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for LockRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LockRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for LockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class) => write!(f, "<{}> (a {class})", self.id),
            None => write!(f, "<{}>", self.id),
        }
    }
}

/// One stack frame line, verbatim minus the leading `at `
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackFrame(String);

impl StackFrame {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StackFrame {
    fn from(s: &str) -> Self {
        StackFrame::new(s)
    }
}

/// One thread's state at the instant the dump was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    /// Display name. Not unique within a dump (pooled workers), but stable
    /// across sequential dumps of the same live process.
    pub name: String,
    /// Java thread number (`#12`). Dump-local, may be reused.
    pub id: Option<u64>,
    /// Native thread handle (`tid=0x...`).
    pub tid: Option<u64>,
    /// OS thread id (`nid=0x...`).
    pub nid: Option<u64>,
    pub priority: Option<u32>,
    pub daemon: bool,
    pub state: ThreadState,
    /// Parenthesised qualifier from the state line, e.g. `on object monitor`.
    pub state_detail: Option<String>,
    pub held_locks: BTreeSet<LockRef>,
    /// Only set when `state` can wait on a lock.
    pub waiting_on: Option<LockRef>,
    pub stack: Vec<StackFrame>,
}

impl ThreadRecord {
    /// A thread with no metadata, `Unknown` state and an empty stack.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            tid: None,
            nid: None,
            priority: None,
            daemon: false,
            state: ThreadState::Unknown,
            state_detail: None,
            held_locks: BTreeSet::new(),
            waiting_on: None,
            stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: ThreadState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_frames<I, F>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<StackFrame>,
    {
        self.stack.extend(frames.into_iter().map(Into::into));
        self
    }

    /// Innermost frame, if the stanza had any.
    #[must_use]
    pub fn top_frame(&self) -> Option<&StackFrame> {
        self.stack.first()
    }

    #[must_use]
    pub fn holds(&self, lock: &LockRef) -> bool {
        self.held_locks.contains(lock)
    }
}

/// Runtime family detected from the dump banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JvmVendor {
    OpenJdk,
    Ibm,
    #[default]
    Unknown,
}

impl fmt::Display for JvmVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JvmVendor::OpenJdk => f.write_str("OpenJDK/HotSpot"),
            JvmVendor::Ibm => f.write_str("IBM J9/OpenJ9"),
            JvmVendor::Unknown => f.write_str("unknown"),
        }
    }
}

/// Why a stanza header was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderDefect {
    /// The opening quote has no matching closing quote.
    UnterminatedName,
    /// `""` with nothing in between.
    EmptyName,
    /// A quoted name followed by nothing that looks like thread metadata.
    MissingMetadata,
}

impl fmt::Display for HeaderDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderDefect::UnterminatedName => f.write_str("thread name has no closing quote"),
            HeaderDefect::EmptyName => f.write_str("thread name is empty"),
            HeaderDefect::MissingMetadata => f.write_str("no thread metadata after the name"),
        }
    }
}

/// A stanza the parser dropped, with the 1-based line of its header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStanza {
    pub line: usize,
    pub defect: HeaderDefect,
}

/// One parsed thread dump. Immutable once the parser hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Timestamp from the dump preamble. Never fabricated.
    pub captured_at: Option<NaiveDateTime>,
    /// `Full thread dump ...` banner, without the trailing colon.
    pub runtime: Option<String>,
    #[serde(default)]
    pub vendor: JvmVendor,
    /// Threads in dump text order.
    pub threads: Vec<ThreadRecord>,
    #[serde(default)]
    pub skipped: Vec<SkippedStanza>,
}

impl Snapshot {
    /// A snapshot with no preamble metadata.
    #[must_use]
    pub fn new(threads: Vec<ThreadRecord>) -> Self {
        Self {
            captured_at: None,
            runtime: None,
            vendor: JvmVendor::Unknown,
            threads,
            skipped: Vec::new(),
        }
    }

    /// Number of stanzas dropped for a malformed header.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn threads_named<'n, 'a: 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a ThreadRecord> + 'n {
        self.threads.iter().filter(move |t| t.name == name)
    }

    /// Thread count per state, in state order.
    #[must_use]
    pub fn state_counts(&self) -> BTreeMap<ThreadState, usize> {
        let mut counts = BTreeMap::new();
        for thread in &self.threads {
            *counts.entry(thread.state).or_insert(0) += 1;
        }
        counts
    }
}

/// Inclusive range of snapshot indices (0-based, input order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct SnapshotWindow {
    pub start: usize,
    pub end: usize,
}

impl SnapshotWindow {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "window start after end");
        Self { start, end }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    /// Windows always cover at least one snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

#[derive(Deserialize)]
struct WindowBounds {
    start: usize,
    end: usize,
}

impl TryFrom<WindowBounds> for SnapshotWindow {
    type Error = String;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        if bounds.start > bounds.end {
            return Err(format!("window start {} is after end {}", bounds.start, bounds.end));
        }
        Ok(Self { start: bounds.start, end: bounds.end })
    }
}

impl fmt::Display for SnapshotWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}..=#{}", self.start, self.end)
    }
}

/// A thread that stayed in a blocking-like state across a sustained run of
/// consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronicBlockEntry {
    pub thread_name: String,
    /// Length of the reported run.
    pub consecutive_blocked_count: usize,
    /// The reported run: the longest one, latest on ties.
    pub window_snapshot_indices: SnapshotWindow,
    /// Every run that met the threshold, in chronological order.
    pub qualifying_runs: Vec<SnapshotWindow>,
    /// Snapshots in which the name appeared at all.
    pub occurrences: usize,
    pub last_observed_state: ThreadState,
    pub last_observed_waiting_on: Option<LockRef>,
    pub last_observed_stack: Vec<StackFrame>,
}
