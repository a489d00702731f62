//! # stallwatch - Chronic Block Detection for JVM Thread Dumps
//!
//! stallwatch reads textual JVM thread dumps (`jstack`, `jcmd Thread.print`,
//! `kill -3` output and IBM J9 javacores), turns each one into a structured
//! [`Snapshot`](domain::Snapshot), and scans a time-ordered series of
//! snapshots for threads that stay blocked across consecutive dumps.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  dump files (one per capture)                   │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ raw text
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     stallwatch (This Crate)                     │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │      io      │──▶│    parser    │──▶│  detection   │         │
//! │  │ (load, sort) │   │  (stanzas)   │   │  (timelines) │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │                             │                  │                │
//! │                             ▼                  ▼                │
//! │                     ┌──────────────┐   ┌──────────────┐         │
//! │                     │   analysis   │   │ report/export│         │
//! │                     │ (contention) │   │ (text, json) │         │
//! │                     └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`domain`]: Snapshot, thread record, lock and report types plus the
//!   error enums shared by every layer
//! - [`parser`]: Stanza-based thread dump parser (HotSpot and J9 layouts)
//! - [`detection`]: Per-thread timelines and chronic block detection
//!   - `policy`: Blocking states, run threshold and filters
//! - [`classification`]: Application, framework and JDK frame origins
//! - [`analysis`]: Lock contention summaries within and across snapshots
//! - [`export`]: JSON/YAML interchange and the text-in/text-out entry points
//! - [`report`]: Human-readable rendering
//! - [`io`]: Dump discovery, concurrent loading and chronological ordering
//! - [`cli`]: Command-line argument parsing
//!
//! ## Typical Usage
//!
//! ```bash
//! # Inspect one dump
//! stallwatch view dumps/app-1.jstack
//!
//! # Find threads blocked across every dump in a directory
//! stallwatch analyze dumps/
//!
//! # Allow shorter runs and emit JSON
//! stallwatch analyze dumps/ --threshold 3 --output json
//! ```
//!
//! ## Key Concepts
//!
//! - **Stanza**: One thread's section of a dump, a quoted header line plus
//!   its state, frames and lock lines
//! - **Timeline**: A thread's observations across snapshots, keyed by name
//! - **Run**: Consecutive snapshots in which the thread is in a blocking state
//! - **Chronic block**: A run at least as long as the configured threshold

pub mod analysis;
pub mod classification;
pub mod cli;
pub mod detection;
pub mod domain;
pub mod export;
pub mod io;
pub mod parser;
pub mod report;
