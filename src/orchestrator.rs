// src/orchestrator.rs

//! Submission orchestrator.
//!
//! One run walks `Validating -> Filtering -> Submitting -> Done`; `Failed`
//! is reachable from any phase.
//!
//! - `Validating` checks the *full* graph.
//! - `Filtering` applies the incremental filter and goes straight to `Done`
//!   when nothing needs to run.
//! - `Submitting` hands the restricted graph, in topological order, to the
//!   backend. A backend failure surfaces every record produced so far.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::backend::{Backend, DeclarationArtifact, Delivery, JobId, SubmissionRecord};
use crate::dag::{Graph, NodeName, filter};
use crate::errors::{DagshipError, NoWorkError, Result};
use crate::fs::FileSystem;
use crate::types::SubmitMode;
use crate::validate::{ValidationContext, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Validating,
    Filtering,
    Submitting,
    Done,
    Failed,
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The filter selected nothing; no backend call was made.
    NoWork(NoWorkError),
    Declared(DeclarationArtifact),
    Submitted(Vec<SubmissionRecord>),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Every phase the run passed through, in order.
    pub phases: Vec<RunPhase>,
    /// Topological order of the nodes handed to the backend.
    pub order: Vec<NodeName>,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// `(node, job id)` pairs in submission order; empty for declarations.
    pub fn job_ids(&self) -> Vec<(&str, &JobId)> {
        match &self.outcome {
            RunOutcome::Submitted(records) => records
                .iter()
                .map(|r| (r.node_name.as_str(), &r.backend_job_id))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nodes the backend received (declared or submitted).
    pub fn delivered(&self) -> Vec<&str> {
        match &self.outcome {
            RunOutcome::NoWork(_) => Vec::new(),
            RunOutcome::Declared(artifact) => artifact.nodes.iter().map(|n| n.name.as_str()).collect(),
            RunOutcome::Submitted(records) => records.iter().map(|r| r.node_name.as_str()).collect(),
        }
    }

    pub fn is_no_work(&self) -> bool {
        matches!(self.outcome, RunOutcome::NoWork(_))
    }
}

/// Tracks the current phase and the trail behind it.
#[derive(Debug)]
struct PhaseTracker {
    phases: Vec<RunPhase>,
}

impl PhaseTracker {
    fn start() -> Self {
        debug!(phase = ?RunPhase::Validating, "orchestrator run started");
        Self {
            phases: vec![RunPhase::Validating],
        }
    }

    fn current(&self) -> RunPhase {
        self.phases.last().copied().unwrap_or(RunPhase::Validating)
    }

    fn advance(&mut self, next: RunPhase) {
        debug!(from = ?self.current(), to = ?next, "orchestrator phase transition");
        self.phases.push(next);
    }

    fn fail(&mut self, err: DagshipError) -> DagshipError {
        error!(phase = ?self.current(), error = %err, "orchestrator run failed");
        self.phases.push(RunPhase::Failed);
        err
    }
}

pub struct Orchestrator {
    backend: Backend,
    validation: ValidationContext,
    mode: SubmitMode,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.backend)
            .field("validation", &self.validation)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        backend: Backend,
        validation: ValidationContext,
        mode: SubmitMode,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            backend,
            validation,
            mode,
            fs,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn mode(&self) -> SubmitMode {
        self.mode
    }

    /// Drive one run over `graph`.
    ///
    /// Returns `Ok` with [`RunOutcome::NoWork`] when the filter selects
    /// nothing. Errors are [`DagshipError::Validation`],
    /// [`DagshipError::Graph`] or [`DagshipError::Submission`]; the latter
    /// carries the records of the nodes that did reach the backend.
    pub async fn run(&self, graph: &Graph) -> Result<RunReport> {
        let mut tracker = PhaseTracker::start();

        if let Err(err) = validate(graph, &self.validation, self.fs.as_ref()) {
            return Err(tracker.fail(err.into()));
        }

        tracker.advance(RunPhase::Filtering);
        let included = match filter(graph, self.mode) {
            Ok(included) => included,
            Err(no_work) => {
                info!(mode = %self.mode, "nothing to submit");
                tracker.advance(RunPhase::Done);
                return Ok(RunReport {
                    phases: tracker.phases,
                    order: Vec::new(),
                    outcome: RunOutcome::NoWork(no_work),
                });
            }
        };
        let filtered = graph.restrict(&included);

        tracker.advance(RunPhase::Submitting);
        let order = match filtered.topological_order() {
            Ok(order) => order,
            Err(err) => return Err(tracker.fail(err.into())),
        };

        info!(
            backend = self.backend.name(),
            mode = %self.mode,
            nodes = order.len(),
            "delivering graph to backend"
        );

        let outcome = match self.backend.deliver(&filtered, &order).await {
            Ok(Delivery::Declared(artifact)) => RunOutcome::Declared(artifact),
            Ok(Delivery::Submitted(records)) => RunOutcome::Submitted(records),
            Err(failure) => return Err(tracker.fail(failure.into())),
        };

        tracker.advance(RunPhase::Done);
        Ok(RunReport {
            phases: tracker.phases,
            order,
            outcome,
        })
    }
}
