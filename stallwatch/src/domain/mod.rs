//! Domain model for stallwatch
//!
//! This module contains core domain types and errors that provide:
//! - The snapshot model produced by the parser and read by the detector
//! - Closed error enums for each stage

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{
    ChronicBlockEntry, HeaderDefect, JvmVendor, LockRef, SkippedStanza, Snapshot, SnapshotWindow,
    StackFrame, ThreadRecord, ThreadState,
};

pub use errors::{DetectError, ExportError, ParseError};
