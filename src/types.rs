use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which nodes of the pipeline a run submits.
///
/// - `All`: every node, regardless of status (a forced full run).
/// - `Incremental`: only nodes flagged as needing execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    #[serde(alias = "force")]
    All,
    Incremental,
}

impl Default for SubmitMode {
    fn default() -> Self {
        SubmitMode::Incremental
    }
}

impl fmt::Display for SubmitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitMode::All => f.write_str("force"),
            SubmitMode::Incremental => f.write_str("incremental"),
        }
    }
}

impl FromStr for SubmitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "force" => Ok(SubmitMode::All),
            "incremental" => Ok(SubmitMode::Incremental),
            other => Err(format!(
                "invalid mode: {other} (expected \"incremental\" or \"force\")"
            )),
        }
    }
}

/// Execution backend a pipeline is exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Write a declaration for a workflow-scheduler host to pick up later.
    Scheduler,
    /// Submit jobs to a batch-compute queue right away.
    Batch,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Scheduler => f.write_str("scheduler"),
            BackendKind::Batch => f.write_str("batch"),
        }
    }
}

/// Mode for storing task fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Store fingerprints in a file (`<workspace>/.dagship/fingerprints`).
    File,
    /// Store fingerprints in memory only (every run sees a cold store).
    Memory,
}

impl Default for HashStorageMode {
    fn default() -> Self {
        HashStorageMode::File
    }
}
