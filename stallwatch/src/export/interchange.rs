use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;

use crate::detection::{detect, DetectionPolicy};
use crate::domain::{ChronicBlockEntry, ExportError, Snapshot};
use crate::parser;

/// Interchange encodings supported for snapshots and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Yaml,
}

/// Encode any model value as pretty-printed JSON or YAML.
///
/// # Errors
/// Propagates serializer failures.
pub fn encode<T: Serialize + ?Sized>(value: &T, encoding: Encoding) -> Result<String, ExportError> {
    Ok(match encoding {
        Encoding::Json => serde_json::to_string_pretty(value)?,
        Encoding::Yaml => serde_yaml::to_string(value)?,
    })
}

/// Decode a value previously produced by [`encode`].
///
/// # Errors
/// Returns the deserializer error for malformed or mismatched input.
pub fn decode<T: DeserializeOwned>(text: &str, encoding: Encoding) -> Result<T, ExportError> {
    Ok(match encoding {
        Encoding::Json => serde_json::from_str(text)?,
        Encoding::Yaml => serde_yaml::from_str(text)?,
    })
}

/// Stream a value as JSON into `writer`, followed by a newline.
///
/// # Errors
/// Fails on serialization or write errors.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Dump text in, snapshot JSON out.
///
/// # Errors
/// [`ExportError::Parse`] when the dump has no usable thread stanza.
pub fn parse_to_json(raw: &str) -> Result<String, ExportError> {
    let snapshot = parser::parse(raw)?;
    encode(&snapshot, Encoding::Json)
}

/// JSON array of snapshots in, JSON array of chronic block entries out.
///
/// # Errors
/// [`ExportError::Json`] for malformed input, [`ExportError::Detect`] for
/// fewer than two snapshots.
pub fn detect_from_json(snapshots_json: &str, policy: &DetectionPolicy) -> Result<String, ExportError> {
    let snapshots: Vec<Snapshot> = decode(snapshots_json, Encoding::Json)?;
    let entries: Vec<ChronicBlockEntry> = detect(&snapshots, policy)?;
    encode(&entries, Encoding::Json)
}
