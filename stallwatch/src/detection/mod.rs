//! Chronic block detection
//!
//! Correlates threads by name across an ordered series of snapshots and
//! flags those that stay in a blocking-like state for a sustained run.

pub mod chronic;
pub mod policy;

pub use chronic::{detect, MIN_SNAPSHOTS};
pub use policy::{default_blocking_states, ChronicThreshold, DetectionPolicy};
