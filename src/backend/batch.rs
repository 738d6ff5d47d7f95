// src/backend/batch.rs

//! Batch-submission adapter.
//!
//! Every node gets its own Tokio task. A task first waits on the registry
//! slots of its upstream nodes, then calls the queue, then publishes its own
//! job id. Independent branches therefore submit concurrently while a node
//! is never handed to the backend before all of its dependency ids exist.
//!
//! When one submission fails, no further submissions are started. Calls
//! already in flight are left alone and awaited, and the aggregate result
//! (records so far + failures) is returned.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::backend::registry::JobIdRegistry;
use crate::backend::{JobQueue, JobRequest, SubmissionRecord};
use crate::dag::{Graph, NodeName};
use crate::errors::{SubmissionError, SubmissionFailure};

/// How one node's submission task ended.
#[derive(Debug)]
enum NodeOutcome {
    Submitted(SubmissionRecord),
    /// Not handed to the backend: an upstream node never got an id, or the
    /// run had already stopped.
    Skipped,
    Failed(SubmissionError),
}

pub struct BatchAdapter {
    queue: Arc<dyn JobQueue>,
    image: String,
}

impl fmt::Debug for BatchAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchAdapter")
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

impl BatchAdapter {
    pub fn new(queue: Arc<dyn JobQueue>, image: impl Into<String>) -> Self {
        Self {
            queue,
            image: image.into(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Submit every node of `graph`, following `order` (a topological order
    /// of `graph`).
    ///
    /// On success the records come back in `order`. Upstream names that are
    /// not part of `graph` are treated as already satisfied.
    pub async fn submit(
        &self,
        graph: &Graph,
        order: &[NodeName],
    ) -> Result<Vec<SubmissionRecord>, SubmissionFailure> {
        let registry = Arc::new(JobIdRegistry::new(order.iter().cloned()));
        let halted = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(order.len());

        for name in order {
            let Some(node) = graph.get(name) else {
                warn!(node = %name, "ordered node missing from graph; skipping");
                continue;
            };

            let upstream: Vec<NodeName> = node
                .upstream
                .iter()
                .filter(|up| graph.contains(up))
                .cloned()
                .collect();

            let request = JobRequest {
                node: node.name.clone(),
                command: node.command.clone(),
                image: self.image.clone(),
                depends_on: Vec::new(),
            };

            let queue = Arc::clone(&self.queue);
            let registry = Arc::clone(&registry);
            let halted = Arc::clone(&halted);

            let handle = tokio::spawn(async move {
                submit_node(queue, registry, halted, upstream, request).await
            });
            handles.push((name.clone(), handle));
        }

        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        for (name, handle) in handles {
            match handle.await {
                Ok(NodeOutcome::Submitted(record)) => records.push(record),
                Ok(NodeOutcome::Skipped) => skipped.push(name),
                Ok(NodeOutcome::Failed(err)) => failures.push(err),
                Err(join_err) => {
                    // The task is gone; make sure dependents stop waiting.
                    halted.store(true, Ordering::SeqCst);
                    registry.abandon(&name);
                    failures.push(SubmissionError {
                        node_name: name,
                        backend_message: format!("submission task aborted: {join_err}"),
                    });
                }
            }
        }

        if failures.is_empty() {
            info!(submitted = records.len(), "all jobs submitted");
            Ok(records)
        } else {
            error!(
                failed = failures.len(),
                submitted = records.len(),
                skipped = skipped.len(),
                "batch submission stopped"
            );
            Err(SubmissionFailure {
                failures,
                records,
                skipped,
            })
        }
    }
}

async fn submit_node(
    queue: Arc<dyn JobQueue>,
    registry: Arc<JobIdRegistry>,
    halted: Arc<AtomicBool>,
    upstream: Vec<NodeName>,
    mut request: JobRequest,
) -> NodeOutcome {
    let name = request.node.clone();

    for up in upstream.iter() {
        match registry.wait_for(up).await {
            Some(id) => request.depends_on.push(id),
            None => {
                debug!(node = %name, upstream = %up, "upstream has no job id; not submitting");
                registry.abandon(&name);
                return NodeOutcome::Skipped;
            }
        }
    }

    if halted.load(Ordering::SeqCst) {
        debug!(node = %name, "run stopped after a failure; not submitting");
        registry.abandon(&name);
        return NodeOutcome::Skipped;
    }

    let dependency_ids = request.depends_on.clone();

    match queue.submit_job(request).await {
        Ok(job_id) => {
            registry.publish(&name, job_id.clone());
            info!(
                node = %name,
                job_id = %job_id,
                depends_on = ?dependency_ids,
                "submitted job"
            );
            NodeOutcome::Submitted(SubmissionRecord {
                node_name: name,
                backend_job_id: job_id,
                dependency_ids,
            })
        }
        Err(err) => {
            halted.store(true, Ordering::SeqCst);
            registry.abandon(&name);
            let backend_message = format!("{err:#}");
            error!(node = %name, error = %backend_message, "job submission failed");
            NodeOutcome::Failed(SubmissionError {
                node_name: name,
                backend_message,
            })
        }
    }
}
