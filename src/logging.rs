// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from `--log-level` when given, otherwise from the
//! `DAGSHIP_LOG` environment variable (full `EnvFilter` syntax, e.g.
//! `info,dagship::backend=debug`), otherwise `info`.
//!
//! Output goes to stderr; stdout carries only the run summary (job ids,
//! declaration paths) so it can be piped.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "DAGSHIP_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_directive());
    }

    env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error"));
        let rendered = filter.to_string();
        assert!(rendered.contains("debug"), "{rendered}");
        assert!(!rendered.contains("error"), "{rendered}");
    }

    #[test]
    fn env_directives_are_used_verbatim() {
        let filter = build_filter(None, Some("warn,dagship::backend=trace"));
        assert!(filter.to_string().contains("dagship::backend=trace"));
    }

    #[test]
    fn invalid_or_empty_env_falls_back_to_info() {
        for env in [Some("  "), Some("dagship=loud"), None] {
            let rendered = build_filter(None, env).to_string();
            assert!(rendered.contains("info"), "{env:?} -> {rendered}");
        }
    }
}
