//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::detection::{ChronicThreshold, DetectionPolicy};
use crate::domain::ThreadState;

#[derive(Parser, Debug)]
#[command(
    name = "stallwatch",
    version,
    about = "Parse JVM thread dumps and find threads that stay blocked across them",
    after_help = "\
EXAMPLES:
    stallwatch view app-1.jstack                         Show one parsed dump
    stallwatch analyze dumps/                            Threads blocked in every dump
    stallwatch analyze a.jstack b.jstack --threshold 2   Allow shorter runs
    stallwatch analyze dumps/ --output json --contention JSON report with lock hotspots"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a single thread dump and print its threads
    View {
        /// Thread dump file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,

        /// Package prefix of the application's own code (e.g. com.example)
        #[arg(long, value_name = "PACKAGE")]
        app_package: Option<String>,
    },

    /// Detect chronically blocked threads across a series of dumps
    Analyze {
        /// Dump files or directories of dumps, at least two dumps in total
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,

        /// Also summarise lock contention across the dumps
        #[arg(long)]
        contention: bool,
    },
}

/// Flags that make up the detection policy.
#[derive(clap::Args, Debug, Clone)]
pub struct PolicyArgs {
    /// Minimum consecutive blocked dumps (default: all dumps)
    #[arg(short, long, value_name = "N")]
    pub threshold: Option<usize>,

    /// Minimum dumps a thread must appear in
    #[arg(long, value_name = "N", default_value_t = crate::detection::policy::DEFAULT_MIN_OCCURRENCES)]
    pub min_occurrences: usize,

    /// States that count as blocking (default: BLOCKED,WAITING,TIMED_WAITING)
    #[arg(long, value_name = "STATES", value_delimiter = ',')]
    pub blocking_states: Vec<ThreadState>,

    /// Only report threads whose stacks contain application frames
    #[arg(long)]
    pub application_only: bool,

    /// Package prefix of the application's own code (e.g. com.example)
    #[arg(long, value_name = "PACKAGE")]
    pub app_package: Option<String>,
}

impl PolicyArgs {
    #[must_use]
    pub fn to_policy(&self) -> DetectionPolicy {
        let mut policy = DetectionPolicy::new().with_min_occurrences(self.min_occurrences);
        if let Some(runs) = self.threshold {
            policy = policy.with_threshold(ChronicThreshold::Runs(runs));
        }
        if !self.blocking_states.is_empty() {
            policy = policy.with_blocking_states(self.blocking_states.iter().copied());
        }
        if self.application_only {
            policy = policy.application_only(self.app_package.clone());
        } else {
            policy.app_package.clone_from(&self.app_package);
        }
        policy
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("stallwatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_view_defaults_to_text() {
        let args = parse(&["view", "app.jstack"]);
        match args.command {
            Command::View { file, output, app_package } => {
                assert_eq!(file, PathBuf::from("app.jstack"));
                assert_eq!(output, OutputFormat::Text);
                assert!(app_package.is_none());
            }
            Command::Analyze { .. } => panic!("expected view"),
        }
    }

    #[test]
    fn test_analyze_default_policy() {
        let args = parse(&["analyze", "a.jstack", "b.jstack"]);
        let Command::Analyze { paths, policy, output, contention } = args.command else {
            panic!("expected analyze");
        };

        assert_eq!(paths.len(), 2);
        assert_eq!(output, OutputFormat::Text);
        assert!(!contention);
        assert_eq!(policy.to_policy(), DetectionPolicy::default());
    }

    #[test]
    fn test_analyze_policy_flags() {
        let args = parse(&[
            "analyze",
            "dumps",
            "--threshold",
            "3",
            "--min-occurrences",
            "4",
            "--blocking-states",
            "blocked,timed-waiting",
            "--application-only",
            "--app-package",
            "com.example",
            "-o",
            "json",
            "--quiet",
        ]);
        assert!(args.quiet);
        let Command::Analyze { policy, output, .. } = args.command else {
            panic!("expected analyze");
        };
        let policy = policy.to_policy();

        assert_eq!(output, OutputFormat::Json);
        assert_eq!(policy.chronic_threshold, ChronicThreshold::Runs(3));
        assert_eq!(policy.min_occurrences, 4);
        assert!(policy.is_blocking(ThreadState::Blocked));
        assert!(policy.is_blocking(ThreadState::TimedWaiting));
        assert!(!policy.is_blocking(ThreadState::Waiting));
        assert!(policy.application_only);
        assert_eq!(policy.app_package.as_deref(), Some("com.example"));
    }

    #[test]
    fn test_analyze_requires_path() {
        assert!(Args::try_parse_from(["stallwatch", "analyze"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_state() {
        assert!(Args::try_parse_from(["stallwatch", "analyze", "d", "--blocking-states", "sleepy"]).is_err());
    }
}
