// src/backend/mod.rs

//! Execution backends.
//!
//! A [`Backend`] is one of two variants sharing the declare/submit
//! capability pair:
//!
//! - [`Backend::Scheduler`] builds a [`DeclarationArtifact`] (one declared
//!   node per graph node, one edge per upstream relation) for a
//!   workflow-scheduler host to interpret later. See [`declare`].
//! - [`Backend::Batch`] submits one job per node to a queue right away,
//!   wiring `depends-on` references as it goes. See [`batch`].
//!
//! The queue itself is reached through the [`JobQueue`] trait so tests can
//! swap in a fake; production uses [`command_queue::CommandJobQueue`].
//! New backends add a variant here.

pub mod batch;
pub mod command_queue;
pub mod declare;
pub mod registry;
pub mod render;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

use crate::dag::{Graph, NodeName};
use crate::errors::SubmissionFailure;

pub use batch::BatchAdapter;
pub use command_queue::CommandJobQueue;
pub use declare::{DeclarationArtifact, DeclaredEdge, DeclaredNode, SchedulerAdapter};
pub use registry::JobIdRegistry;

/// Opaque job handle assigned by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Everything a queue needs to accept one node's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub node: NodeName,
    pub command: Vec<String>,
    /// Container image reference, threaded through untouched.
    pub image: String,
    /// Backend ids of the in-run upstream nodes, in upstream order.
    pub depends_on: Vec<JobId>,
}

/// Per-node outcome of a batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub node_name: NodeName,
    pub backend_job_id: JobId,
    /// Ids of upstream nodes present in the submitted graph. Upstream nodes
    /// filtered out of the run are already satisfied and never appear here.
    pub dependency_ids: Vec<JobId>,
}

/// The "submit one job with dependencies" operation of a batch queue.
pub trait JobQueue: Send + Sync {
    /// Submit a single job. Every id in `request.depends_on` already exists
    /// in the backend when this is called.
    fn submit_job(
        &self,
        request: JobRequest,
    ) -> Pin<Box<dyn Future<Output = Result<JobId>> + Send + '_>>;
}

/// What a backend produced for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Declared(DeclarationArtifact),
    Submitted(Vec<SubmissionRecord>),
}

pub enum Backend {
    Scheduler(SchedulerAdapter),
    Batch(BatchAdapter),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Scheduler(adapter) => f.debug_tuple("Scheduler").field(adapter).finish(),
            Backend::Batch(adapter) => f.debug_tuple("Batch").field(adapter).finish(),
        }
    }
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Scheduler(_) => "scheduler",
            Backend::Batch(_) => "batch",
        }
    }

    /// Hand the (already filtered) graph to the backend.
    ///
    /// `order` must be a topological order of `graph`; the declaration
    /// variant ignores it.
    pub async fn deliver(
        &self,
        graph: &Graph,
        order: &[NodeName],
    ) -> std::result::Result<Delivery, SubmissionFailure> {
        match self {
            Backend::Scheduler(adapter) => Ok(Delivery::Declared(adapter.declare(graph))),
            Backend::Batch(adapter) => adapter.submit(graph, order).await.map(Delivery::Submitted),
        }
    }
}
