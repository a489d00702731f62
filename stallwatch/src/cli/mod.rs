//! Command-line interface for stallwatch
//!
//! This module contains CLI argument parsing and the mapping from flags to a
//! detection policy.

pub mod args;

pub use args::{Args, Command, OutputFormat, PolicyArgs};
