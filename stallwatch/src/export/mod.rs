//! Result encoding
//!
//! This module turns snapshots and detection reports into an interchange
//! representation and back. JSON is the primary encoding; YAML is offered for
//! reading reports by eye. Every model field round-trips losslessly.
//!
//! It also carries the text-in/text-out entry points for embedding the core
//! behind a string boundary (`parse_to_json`, `detect_from_json`).

pub mod interchange;

pub use interchange::{decode, detect_from_json, encode, parse_to_json, write_json, Encoding};
