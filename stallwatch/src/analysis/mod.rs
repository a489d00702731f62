//! Analysis logic for parsed snapshots
//!
//! This module contains pure business logic for summarising thread dumps,
//! separated from the report rendering layer.

pub mod contention;

pub use contention::{analyze_contention, ContentionStats, LockContention, LockHotspot};
