// src/backend/registry.rs

//! Publish-once map from node name to backend job id.
//!
//! Each node owns one slot, backed by a `tokio::sync::watch` channel. A slot
//! moves from `Pending` to either `Published(id)` or `Abandoned` exactly once
//! and never changes afterwards, so readers see an id either fully or not
//! at all.

use std::collections::HashMap;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::backend::JobId;
use crate::dag::NodeName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Published(JobId),
    /// The node will never get an id in this run (it failed, or one of its
    /// upstream nodes did).
    Abandoned,
}

#[derive(Debug)]
pub struct JobIdRegistry {
    slots: HashMap<NodeName, watch::Sender<SlotState>>,
}

impl JobIdRegistry {
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeName>,
    {
        let slots = nodes
            .into_iter()
            .map(|name| (name.into(), watch::Sender::new(SlotState::Pending)))
            .collect();
        Self { slots }
    }

    /// Publish `id` for `node`. Returns `false` (and leaves the slot alone)
    /// if the slot was already settled or the node is unknown.
    pub fn publish(&self, node: &str, id: JobId) -> bool {
        self.settle(node, SlotState::Published(id))
    }

    /// Mark `node` as never getting an id in this run.
    pub fn abandon(&self, node: &str) -> bool {
        self.settle(node, SlotState::Abandoned)
    }

    fn settle(&self, node: &str, state: SlotState) -> bool {
        let Some(slot) = self.slots.get(node) else {
            warn!(node = %node, "settling unknown registry slot; ignoring");
            return false;
        };

        let settled = slot.send_if_modified(|current| {
            if *current == SlotState::Pending {
                *current = state.clone();
                true
            } else {
                false
            }
        });

        if !settled {
            debug!(node = %node, "registry slot already settled");
        }
        settled
    }

    pub fn state(&self, node: &str) -> Option<SlotState> {
        self.slots.get(node).map(|slot| slot.borrow().clone())
    }

    /// The published id, if any, without waiting.
    pub fn get(&self, node: &str) -> Option<JobId> {
        match self.state(node)? {
            SlotState::Published(id) => Some(id),
            _ => None,
        }
    }

    /// Wait until `node`'s slot settles. Returns `None` if it was abandoned
    /// or the node is unknown.
    pub async fn wait_for(&self, node: &str) -> Option<JobId> {
        let mut rx = self.slots.get(node)?.subscribe();
        let state = rx
            .wait_for(|s| *s != SlotState::Pending)
            .await
            .ok()?
            .clone();

        match state {
            SlotState::Published(id) => Some(id),
            _ => None,
        }
    }

    /// Every published id.
    pub fn snapshot(&self) -> HashMap<NodeName, JobId> {
        self.slots
            .iter()
            .filter_map(|(name, slot)| match &*slot.borrow() {
                SlotState::Published(id) => Some((name.clone(), id.clone())),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn publish_happens_once() {
        let registry = JobIdRegistry::new(["a"]);
        assert!(registry.publish("a", JobId::from("job-1")));
        assert!(!registry.publish("a", JobId::from("job-2")));
        assert!(!registry.abandon("a"));
        assert_eq!(registry.get("a"), Some(JobId::from("job-1")));
    }

    #[test]
    fn unknown_node_is_never_settled() {
        let registry = JobIdRegistry::new(["a"]);
        assert!(!registry.publish("zzz", JobId::from("job-1")));
        assert_eq!(registry.state("zzz"), None);
    }

    #[tokio::test]
    async fn waiter_sees_id_published_later() {
        let registry = Arc::new(JobIdRegistry::new(["a"]));

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_for("a").await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.publish("a", JobId::from("job-a"));

        let seen = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .unwrap();
        assert_eq!(seen, Some(JobId::from("job-a")));
    }

    #[tokio::test]
    async fn waiter_sees_abandonment() {
        let registry = JobIdRegistry::new(["a"]);
        registry.abandon("a");
        assert_eq!(registry.wait_for("a").await, None);
        assert!(registry.snapshot().is_empty());
    }
}
