// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::SubmitMode;

/// Command-line arguments for `dagship`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagship",
    version,
    about = "Validate a task DAG and ship it to a workflow scheduler or a batch job queue.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `dagship.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// `incremental` submits only stale tasks, `force` submits every task.
    ///
    /// If omitted, `[config].mode` is used.
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<SubmitMode>,

    /// Container image reference for the batch backend.
    ///
    /// Overrides `[batch].image`.
    #[arg(long, value_name = "REF")]
    pub image: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGSHIP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load config, assess staleness, print the DAG and what would be
    /// submitted, but deliver nothing.
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_mode(s: &str) -> Result<SubmitMode, String> {
    s.parse()
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_and_image() {
        let args = CliArgs::try_parse_from([
            "dagship",
            "--mode",
            "force",
            "--image",
            "registry/etl:1",
        ])
        .unwrap();
        assert_eq!(args.mode, Some(SubmitMode::All));
        assert_eq!(args.image.as_deref(), Some("registry/etl:1"));
        assert_eq!(args.config, default_config_path());
    }

    #[test]
    fn explicit_config_path_is_kept() {
        let args =
            CliArgs::try_parse_from(["dagship", "--config", "pipelines/etl.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("pipelines/etl.toml"));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(CliArgs::try_parse_from(["dagship", "--mode", "sometimes"]).is_err());
    }
}
