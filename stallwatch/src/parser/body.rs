//! Classification of the lines that follow a stanza header.

use crate::domain::{LockRef, StackFrame, ThreadState};

/// Prefix of the per-thread state line (`java.lang.Thread.State: BLOCKED ...`).
pub(crate) const STATE_MARKER: &str = "java.lang.Thread.State:";

/// Lock-line prefixes (after `- `) meaning the thread is parked on the lock.
const WAIT_PREFIXES: &[&str] = &[
    "waiting to lock ",
    "waiting on ",
    "parking to wait for ",
    "waiting to re-lock in wait() ",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BodyLine {
    State(ThreadState, Option<String>),
    Frame(StackFrame),
    Locked(LockRef),
    WaitingOn(LockRef),
    /// Blank lines, section titles, `- None`, and anything else.
    Other,
}

pub(crate) fn classify_line(line: &str) -> BodyLine {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(STATE_MARKER) {
        let (state, detail) = parse_state_text(rest);
        return BodyLine::State(state, detail);
    }
    if let Some(frame) = line.strip_prefix("at ") {
        return BodyLine::Frame(StackFrame::new(frame.trim()));
    }
    if let Some(lock_line) = line.strip_prefix("- ") {
        return classify_lock_line(lock_line);
    }
    BodyLine::Other
}

/// Parse the text after [`STATE_MARKER`]: a state token and an optional
/// parenthesised qualifier.
pub(crate) fn parse_state_text(text: &str) -> (ThreadState, Option<String>) {
    let text = text.trim();
    let state = text.split_whitespace().next().map_or(ThreadState::Unknown, ThreadState::from_token);

    let detail = match (text.find('('), text.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let inner = text[open + 1..close].trim();
            (!inner.is_empty()).then(|| inner.to_string())
        }
        _ => None,
    };

    (state, detail)
}

fn classify_lock_line(text: &str) -> BodyLine {
    if let Some(rest) = text.strip_prefix("locked ") {
        return parse_lock(rest).map_or(BodyLine::Other, BodyLine::Locked);
    }
    if let Some(rest) = WAIT_PREFIXES.iter().find_map(|prefix| text.strip_prefix(prefix)) {
        return parse_lock(rest).map_or(BodyLine::Other, BodyLine::WaitingOn);
    }
    // Entries under "Locked ownable synchronizers:"
    if text.starts_with('<') {
        return parse_lock(text).map_or(BodyLine::Other, BodyLine::Locked);
    }
    BodyLine::Other
}

/// `<0x000000076ab62208> (a java.lang.Object)` -> lock with class name.
///
/// Placeholders such as `<no object reference available>` are not locks.
fn parse_lock(text: &str) -> Option<LockRef> {
    let inner = text.trim_start().strip_prefix('<')?;
    let close = inner.find('>')?;
    let id = &inner[..close];
    if id.is_empty() || id.contains(char::is_whitespace) {
        return None;
    }

    let lock = LockRef::new(id);
    let rest = inner[close + 1..].trim();
    match rest.strip_prefix("(a ").and_then(|r| r.strip_suffix(')')) {
        Some(class) => Some(lock.with_class(class.trim())),
        None => Some(lock),
    }
}
