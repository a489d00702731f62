//! # Dump Parser
//!
//! Turns the text of one thread dump into a [`Snapshot`].
//!
//! ## Dump Layout
//!
//! ```text
//! 2025-09-21 03:30:13                                   ┐ preamble
//! Full thread dump OpenJDK 64-Bit Server VM (...):      ┘
//!
//! "worker-1" #12 daemon prio=5 ... nid=0x2d waiting ... ┐
//!    java.lang.Thread.State: BLOCKED (on object monitor)│ stanza
//!         at com.example.Foo.bar(Foo.java:10)           │
//!         - waiting to lock <0x...> (a java.lang.Object)│
//!         - locked <0x...> (a java.lang.Object)         ┘
//!
//! "main" #1 prio=5 ...                                  ┐ stanza
//!    ...                                                ┘
//! ```
//!
//! Every line whose first non-blank character is `"` opens a new stanza. A
//! stanza whose header cannot be parsed is dropped together with its body and
//! recorded in [`Snapshot::skipped`]; it is never folded into the thread
//! before it. Only a dump with no usable stanza at all is an error.
//!
//! The `Found one Java-level deadlock` trailer repeats threads already listed
//! above, so stanza collection stops there.

mod body;
mod header;
pub mod vendor;

use crate::domain::{ParseError, SkippedStanza, Snapshot, ThreadRecord, ThreadState};
use body::BodyLine;
use chrono::NaiveDateTime;
use header::Header;
use log::{debug, info, warn};

pub use vendor::detect_vendor;

/// Preamble timestamp format written by `jstack` / `jcmd Thread.print`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BANNER_PREFIX: &str = "Full thread dump ";

/// Parse one dump.
///
/// # Errors
/// Returns [`ParseError::NoThreadsFound`] when the text contains no
/// well-formed thread stanza. Malformed stanzas alone never fail the call.
pub fn parse(raw: &str) -> Result<Snapshot, ParseError> {
    let mut preamble: Vec<&str> = Vec::new();
    let mut threads = Vec::new();
    let mut skipped = Vec::new();
    let mut current: Option<StanzaBuilder> = None;
    let mut seen_stanza = false;

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim_start();

        if is_deadlock_trailer(trimmed) {
            debug!("Deadlock report at line {}, ending stanza scan", idx + 1);
            break;
        }

        if trimmed.starts_with('"') {
            seen_stanza = true;
            threads.extend(current.take().map(StanzaBuilder::finish));

            match header::parse_header(trimmed) {
                Ok(header) => current = Some(StanzaBuilder::new(header)),
                Err(defect) => {
                    let stanza = SkippedStanza { line: idx + 1, defect };
                    warn!("{}", ParseError::from(stanza));
                    skipped.push(stanza);
                }
            }
            continue;
        }

        match current.as_mut() {
            Some(stanza) => stanza.push_line(trimmed),
            None if !seen_stanza => preamble.push(trimmed),
            // Body of a skipped stanza
            None => {}
        }
    }
    threads.extend(current.take().map(StanzaBuilder::finish));

    if threads.is_empty() {
        return Err(ParseError::NoThreadsFound { skipped: skipped.len() });
    }

    let vendor = detect_vendor(&preamble.join("\n"));
    info!("Parsed {} threads ({} skipped), runtime: {vendor}", threads.len(), skipped.len());

    Ok(Snapshot {
        captured_at: preamble.iter().find_map(|line| parse_timestamp(line)),
        runtime: preamble.iter().find_map(|line| parse_banner(line)),
        vendor,
        threads,
        skipped,
    })
}

/// Accumulates one stanza's body lines onto its header.
struct StanzaBuilder {
    record: ThreadRecord,
    state_seen: bool,
    status_hint: Option<ThreadState>,
}

impl StanzaBuilder {
    fn new(header: Header) -> Self {
        let mut record = ThreadRecord::new(header.name);
        record.id = header.id;
        record.tid = header.tid;
        record.nid = header.nid;
        record.priority = header.priority;
        record.daemon = header.daemon;

        let state_seen = header.state.is_some();
        if let Some((state, detail)) = header.state {
            record.state = state;
            record.state_detail = detail;
        }

        Self { record, state_seen, status_hint: header.status_hint }
    }

    fn push_line(&mut self, line: &str) {
        match body::classify_line(line) {
            BodyLine::State(state, detail) => {
                self.record.state = state;
                self.record.state_detail = detail;
                self.state_seen = true;
            }
            BodyLine::Frame(frame) => self.record.stack.push(frame),
            // Keep the entry that names the class
            BodyLine::Locked(lock) => {
                if lock.class_name.is_some() {
                    self.record.held_locks.replace(lock);
                } else {
                    self.record.held_locks.insert(lock);
                }
            }
            // The first wait line sits under the innermost frame
            BodyLine::WaitingOn(lock) => {
                if self.record.waiting_on.is_none() {
                    self.record.waiting_on = Some(lock);
                }
            }
            BodyLine::Other => {}
        }
    }

    fn finish(mut self) -> ThreadRecord {
        if !self.state_seen {
            self.record.state = self.status_hint.unwrap_or(ThreadState::Unknown);
        }
        if !self.record.state.can_wait_on_lock() {
            self.record.waiting_on = None;
        }
        self.record
    }
}

fn is_deadlock_trailer(line: &str) -> bool {
    line.starts_with("Found ") && line.contains("deadlock")
}

fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(line.trim(), TIMESTAMP_FORMAT).ok()
}

fn parse_banner(line: &str) -> Option<String> {
    let banner = line.trim().strip_prefix(BANNER_PREFIX)?;
    let banner = banner.strip_suffix(':').unwrap_or(banner).trim();
    (!banner.is_empty()).then(|| banner.to_string())
}

#[cfg(test)]
mod tests;
