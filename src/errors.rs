// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! - [`GraphError`]: the input graph is malformed (caller bug, never retried).
//! - [`NoWorkError`]: the filtered graph is empty; callers treat it as a clean
//!   early return, not a failure.
//! - [`ValidationError`]: every placement violation found before submission.
//! - [`SubmissionFailure`]: a backend call failed; carries the records of the
//!   nodes that did go through.

use std::fmt;

use thiserror::Error;

use crate::backend::SubmissionRecord;
use crate::types::SubmitMode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("node '{node}' depends on undefined node '{upstream}'")]
    UnknownUpstream { node: String, upstream: String },

    #[error("node '{0}' cannot depend on itself")]
    SelfReference(String),

    #[error("cannot order graph, no progress possible for: {}", .remaining.join(", "))]
    Stalled { remaining: Vec<String> },
}

/// The filter selected no nodes for this run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error(
    "pipeline has no tasks to submit in {mode} mode; use \"--mode force\" to submit all tasks regardless of status"
)]
pub struct NoWorkError {
    pub mode: SubmitMode,
}

/// A single placement problem found by the validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub node: String,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Names of the offending nodes, in report order (may repeat).
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.node.as_str())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pipeline failed validation with {} violation(s):",
            self.violations.len()
        )?;
        for v in &self.violations {
            write!(f, "\n  - {}: {}", v.node, v.message)?;
        }
        Ok(())
    }
}

/// The backend rejected (or failed to accept) one node's job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("submission of node '{node_name}' failed: {backend_message}")]
pub struct SubmissionError {
    pub node_name: String,
    pub backend_message: String,
}

/// Aggregate result of a submission run that did not complete.
///
/// `records` lists every node that reached the backend before the run
/// stopped; those jobs stay live, nothing is rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFailure {
    /// In topological order; the batch adapter never produces an empty list.
    pub failures: Vec<SubmissionError>,
    pub records: Vec<SubmissionRecord>,
    /// Nodes that were never handed to the backend.
    pub skipped: Vec<String>,
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first() {
            Some(first) => write!(f, "{first}")?,
            None => write!(f, "submission failed")?,
        }
        write!(
            f,
            " ({} node(s) submitted, {} not submitted)",
            self.records.len(),
            self.skipped.len()
        )
    }
}

impl SubmissionFailure {
    pub fn first(&self) -> Option<&SubmissionError> {
        self.failures.first()
    }

    pub fn record_for(&self, node: &str) -> Option<&SubmissionRecord> {
        self.records.iter().find(|r| r.node_name == node)
    }
}

#[derive(Error, Debug)]
pub enum DagshipError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    NoWork(#[from] NoWorkError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionFailure),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagshipError>;
