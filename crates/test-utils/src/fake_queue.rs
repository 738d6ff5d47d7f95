use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use dagship::backend::{JobId, JobQueue, JobRequest};

/// A fake job queue that:
/// - records every request it receives, in call order
/// - hands out `job-<name>` ids
/// - fails for the nodes listed via [`RecordingJobQueue::fail_on`]
/// - optionally sleeps per node before answering, to shape concurrency.
#[derive(Debug, Clone, Default)]
pub struct RecordingJobQueue {
    requests: Arc<Mutex<Vec<JobRequest>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
}

impl RecordingJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id this queue assigns to `node`.
    pub fn id_for(node: &str) -> JobId {
        JobId::new(format!("job-{node}"))
    }

    pub fn fail_on(self, node: &str) -> Self {
        self.failing.lock().unwrap().insert(node.to_string());
        self
    }

    pub fn delay(self, node: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(node.to_string(), delay);
        self
    }

    /// Every request received so far (including failed ones).
    pub fn requests(&self) -> Vec<JobRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Node names in the order their requests arrived.
    pub fn submitted_nodes(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.node.clone())
            .collect()
    }

    pub fn request_for(&self, node: &str) -> Option<JobRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.node == node)
            .cloned()
    }
}

impl JobQueue for RecordingJobQueue {
    fn submit_job(
        &self,
        request: JobRequest,
    ) -> Pin<Box<dyn Future<Output = Result<JobId>> + Send + '_>> {
        Box::pin(async move {
            let node = request.node.clone();
            self.requests.lock().unwrap().push(request);

            let delay = self.delays.lock().unwrap().get(&node).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let fails = self.failing.lock().unwrap().contains(&node);
            if fails {
                return Err(anyhow!("queue rejected job for {node}"));
            }
            Ok(Self::id_for(&node))
        })
    }
}
