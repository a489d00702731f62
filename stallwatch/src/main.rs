//! # stallwatch - Main Entry Point
//!
//! Two subcommands:
//! - **view** (`stallwatch view app.jstack`): parse one dump and print it
//! - **analyze** (`stallwatch analyze dumps/`): chronic block detection over
//!   a series of dumps, optionally with lock contention hotspots

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::io::{self, StdoutLock, Write};
use std::path::{Path, PathBuf};

use stallwatch::analysis::ContentionStats;
use stallwatch::cli::{Args, Command, OutputFormat, PolicyArgs};
use stallwatch::detection::detect;
use stallwatch::domain::{DetectError, ParseError, Snapshot};
use stallwatch::export::{encode, write_json, Encoding};
use stallwatch::io::{collect_dump_paths, load_dumps, order_chronologically};
use stallwatch::parser;
use stallwatch::report::{render_report, render_snapshot, AnalysisReport};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NO_DUMPS: i32 = 3;

#[derive(Debug, thiserror::Error)]
#[error("No thread dumps could be parsed from the given paths")]
struct NoDumpsParsed;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<NoDumpsParsed>().is_some() || err.downcast_ref::<ParseError>().is_some() {
        EXIT_NO_DUMPS
    } else if err.downcast_ref::<DetectError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::View { file, output, app_package } => view(&file, output, app_package.as_deref()),
        Command::Analyze { paths, policy, output, contention } => {
            analyze(&paths, &policy, output, contention, args.quiet).await
        }
    }
}

fn view(file: &Path, output: OutputFormat, app_package: Option<&str>) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let snapshot = parser::parse(&String::from_utf8_lossy(&bytes))
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    emit(&snapshot, output, |out| render_snapshot(out, &snapshot, app_package))
}

async fn analyze(
    paths: &[PathBuf],
    policy_args: &PolicyArgs,
    output: OutputFormat,
    contention: bool,
    quiet: bool,
) -> Result<()> {
    let files = collect_dump_paths(paths)?;
    if files.is_empty() {
        return Err(NoDumpsParsed.into());
    }

    let mut dumps = load_dumps(files).await?;
    if dumps.is_empty() {
        return Err(NoDumpsParsed.into());
    }
    let by_timestamp = order_chronologically(&mut dumps);

    let (sources, snapshots): (Vec<String>, Vec<Snapshot>) =
        dumps.into_iter().map(|dump| (dump.path.display().to_string(), dump.snapshot)).unzip();

    if output == OutputFormat::Text && !quiet {
        println!("stallwatch v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "dumps: {} (ordered by {})",
            snapshots.len(),
            if by_timestamp { "capture time" } else { "path" }
        );
    }

    let policy = policy_args.to_policy();
    let chronically_blocked = detect(&snapshots, &policy)?;
    info!("{} chronically blocked threads", chronically_blocked.len());

    let lock_hotspots = if contention {
        let mut stats = ContentionStats::new();
        for snapshot in &snapshots {
            stats.record_snapshot(snapshot);
        }
        stats.to_hotspots()
    } else {
        Vec::new()
    };

    let report = AnalysisReport { snapshot_count: snapshots.len(), sources, chronically_blocked, lock_hotspots };
    emit(&report, output, |out| render_report(out, &report, policy.app_package.as_deref()))
}

/// Write `value` to stdout in the requested format.
fn emit<T, F>(value: &T, output: OutputFormat, render_text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&mut StdoutLock<'static>) -> io::Result<()>,
{
    let mut out = io::stdout().lock();
    match output {
        OutputFormat::Text => render_text(&mut out)?,
        OutputFormat::Json => write_json(&mut out, value)?,
        OutputFormat::Yaml => out.write_all(encode(value, Encoding::Yaml)?.as_bytes())?,
    }
    out.flush()?;
    Ok(())
}
