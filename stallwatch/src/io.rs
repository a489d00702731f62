//! Dump discovery and loading for the command-line front end.
//!
//! Files are read and parsed concurrently on tokio's blocking pool, then put
//! back into a deterministic order before anything downstream sees them.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

use crate::domain::{ParseError, Snapshot};
use crate::parser;

/// Extensions picked up when a directory is given instead of a file.
pub const DUMP_EXTENSIONS: &[&str] = &["jstack", "tdump", "txt", "dump"];

/// A parsed dump and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedDump {
    pub path: PathBuf,
    pub snapshot: Snapshot,
}

/// Expand the command-line inputs into a list of dump files.
///
/// Files are taken as given, whatever their extension. Directories
/// contribute their dump files (non-recursive), sorted by name.
///
/// # Errors
/// - An input path does not exist
/// - A directory cannot be read
pub fn collect_dump_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {}", input.display()))?
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && has_dump_extension(path))
                .collect();
            found.sort();
            debug!("{}: {} dump files", input.display(), found.len());
            paths.extend(found);
        } else if input.exists() {
            paths.push(input.clone());
        } else {
            bail!("No such file or directory: {}", input.display());
        }
    }

    Ok(paths)
}

fn has_dump_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DUMP_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Read and parse every file concurrently, returning results in input order.
///
/// Files that contain no thread stanzas are logged and left out; the caller
/// decides whether what remains is enough.
///
/// # Errors
/// Fails on the first file that cannot be read, or if a loader task panics.
pub async fn load_dumps(paths: Vec<PathBuf>) -> Result<Vec<LoadedDump>> {
    let mut tasks = JoinSet::new();
    for (index, path) in paths.into_iter().enumerate() {
        tasks.spawn_blocking(move || {
            let parsed = read_and_parse(&path);
            (index, path, parsed)
        });
    }

    let mut loaded = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, path, parsed) = joined.context("Dump loader task failed")?;
        match parsed.with_context(|| format!("Failed to read {}", path.display()))? {
            Ok(snapshot) => {
                debug!("{}: {} threads", path.display(), snapshot.threads.len());
                loaded.push((index, LoadedDump { path, snapshot }));
            }
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }

    loaded.sort_by_key(|(index, _)| *index);
    info!("Loaded {} thread dumps", loaded.len());
    Ok(loaded.into_iter().map(|(_, dump)| dump).collect())
}

fn read_and_parse(path: &Path) -> std::io::Result<Result<Snapshot, ParseError>> {
    let bytes = fs::read(path)?;
    Ok(parser::parse(&String::from_utf8_lossy(&bytes)))
}

/// Put dumps in capture order.
///
/// Uses `captured_at` when every dump carries one, otherwise falls back to
/// path order. Returns `true` when timestamps were used.
pub fn order_chronologically(dumps: &mut [LoadedDump]) -> bool {
    if dumps.iter().all(|dump| dump.snapshot.captured_at.is_some()) {
        dumps.sort_by(|a, b| {
            a.snapshot.captured_at.cmp(&b.snapshot.captured_at).then_with(|| a.path.cmp(&b.path))
        });
        true
    } else {
        debug!("Not every dump has a timestamp; ordering by path");
        dumps.sort_by(|a, b| a.path.cmp(&b.path));
        false
    }
}
