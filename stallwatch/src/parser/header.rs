//! Stanza header tokenizer
//!
//! A header is a line that opens with a quoted thread name followed by
//! metadata tokens in no fixed order:
//!
//! ```text
//! "worker-1" #12 daemon prio=5 os_prio=0 tid=0x00007f... nid=0x2d waiting for monitor entry [0x...]
//! "main" J9VMThread:0x..., omrthread:0x..., state:R, prio=5, tid=0x..., nid=0x1, ...
//! ```

use super::body::{parse_state_text, STATE_MARKER};
use crate::domain::{HeaderDefect, ThreadState};

/// Header keys we know but do not keep.
const IGNORED_KEYS: &[&str] = &["os_prio", "cpu", "elapsed", "allocated", "defined_classes"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header {
    pub name: String,
    pub id: Option<u64>,
    pub tid: Option<u64>,
    pub nid: Option<u64>,
    pub priority: Option<u32>,
    pub daemon: bool,
    /// State marker embedded in the header line itself.
    pub state: Option<(ThreadState, Option<String>)>,
    /// Weaker hint from IBM `state:` codes or HotSpot status words. Used only
    /// when the stanza carries no state line.
    pub status_hint: Option<ThreadState>,
}

impl Header {
    fn new(name: String) -> Self {
        Self {
            name,
            id: None,
            tid: None,
            nid: None,
            priority: None,
            daemon: false,
            state: None,
            status_hint: None,
        }
    }

    /// Apply one metadata token. Returns false if the token is not metadata.
    fn apply_token(&mut self, token: &str) -> bool {
        if token == "daemon" {
            self.daemon = true;
            return true;
        }
        if let Some(number) = token.strip_prefix('#') {
            self.id = number.parse().ok();
            return self.id.is_some();
        }
        if let Some(code) = token.strip_prefix("state:") {
            self.status_hint = Some(ibm_state(code));
            return true;
        }
        if let Some((key, value)) = token.split_once('=') {
            match key {
                "prio" => self.priority = value.parse().ok(),
                "tid" => self.tid = parse_number(value),
                "nid" => self.nid = parse_number(value),
                "Id" => self.id = parse_number(value),
                _ if IGNORED_KEYS.contains(&key) => {}
                _ => return false,
            }
            return true;
        }
        token.starts_with("J9VMThread:")
    }
}

pub(crate) fn parse_header(line: &str) -> Result<Header, HeaderDefect> {
    let (name, rest) = split_quoted_name(line)?;
    if name.is_empty() {
        return Err(HeaderDefect::EmptyName);
    }

    let (metadata, state_text) = match rest.split_once(STATE_MARKER) {
        Some((metadata, state_text)) => (metadata, Some(state_text)),
        None => (rest, None),
    };

    let mut header = Header::new(name);
    let mut recognised = state_text.is_some();
    for token in metadata.split_whitespace().map(|t| t.trim_end_matches(',')) {
        recognised |= header.apply_token(token);
    }
    if !recognised {
        return Err(HeaderDefect::MissingMetadata);
    }

    header.state = state_text.map(parse_state_text);
    if header.status_hint.is_none() {
        header.status_hint = status_hint(metadata);
    }
    Ok(header)
}

/// Split `"name" rest...` at the closing quote nearest the start.
///
/// `\"` and `\\` inside the quotes are unescaped; any other backslash is
/// kept as is. jstack prints names raw, so when unescaping never reaches a
/// closing quote (`"C:\" #2`) the first raw `"` ends the name instead.
fn split_quoted_name(line: &str) -> Result<(String, &str), HeaderDefect> {
    let body = line.strip_prefix('"').ok_or(HeaderDefect::UnterminatedName)?;
    if let Some(split) = split_escaped(body) {
        return Ok(split);
    }

    let close = body.find('"').ok_or(HeaderDefect::UnterminatedName)?;
    Ok((body[..close].to_string(), &body[close + 1..]))
}

fn split_escaped(body: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => match chars.peek() {
                Some(&(_, escaped @ ('"' | '\\'))) => {
                    name.push(escaped);
                    chars.next();
                }
                _ => name.push('\\'),
            },
            '"' => return Some((name, &body[idx + 1..])),
            _ => name.push(ch),
        }
    }

    None
}

/// Hex (`0x1f`) or decimal.
fn parse_number(value: &str) -> Option<u64> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// J9 one/two letter thread state codes.
fn ibm_state(code: &str) -> ThreadState {
    match code {
        "R" => ThreadState::Runnable,
        "B" => ThreadState::Blocked,
        "CW" | "P" => ThreadState::Waiting,
        "Z" => ThreadState::Terminated,
        _ => ThreadState::Unknown,
    }
}

/// HotSpot prints a status phrase after the ids (`waiting for monitor entry`).
fn status_hint(metadata: &str) -> Option<ThreadState> {
    let has_word = |word: &str| metadata.split_whitespace().any(|t| t == word);

    if metadata.contains("waiting for monitor entry") {
        Some(ThreadState::Blocked)
    } else if metadata.contains("in Object.wait()") || metadata.contains("waiting on condition") {
        Some(ThreadState::Waiting)
    } else if has_word("sleeping") {
        Some(ThreadState::TimedWaiting)
    } else if has_word("runnable") {
        Some(ThreadState::Runnable)
    } else {
        None
    }
}
