// src/backend/declare.rs

//! Scheduler-declaration adapter.

use serde::Serialize;
use tracing::debug;

use crate::dag::{Graph, NodeName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredNode {
    pub name: NodeName,
    pub command: Vec<String>,
}

/// `downstream` runs after `upstream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredEdge {
    pub upstream: NodeName,
    pub downstream: NodeName,
}

/// In-memory declaration handed to a renderer.
///
/// Its node set and edge set are exactly those of the graph it was declared
/// from: nothing added, nothing dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclarationArtifact {
    pub name: String,
    pub nodes: Vec<DeclaredNode>,
    pub edges: Vec<DeclaredEdge>,
}

impl DeclarationArtifact {
    pub fn node(&self, name: &str) -> Option<&DeclaredNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn has_edge(&self, upstream: &str, downstream: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.upstream == upstream && e.downstream == downstream)
    }
}

/// Builds declarations for a workflow-scheduler host.
#[derive(Debug, Clone, Default)]
pub struct SchedulerAdapter {
    project_name: String,
}

impl SchedulerAdapter {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// One declared node per graph node (declaration order), one edge per
    /// upstream relation.
    pub fn declare(&self, graph: &Graph) -> DeclarationArtifact {
        let nodes = graph
            .nodes()
            .map(|n| DeclaredNode {
                name: n.name.clone(),
                command: n.command.clone(),
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(up, down)| DeclaredEdge {
                upstream: up.to_string(),
                downstream: down.to_string(),
            })
            .collect();

        let artifact = DeclarationArtifact {
            name: self.project_name.clone(),
            nodes,
            edges,
        };

        debug!(
            project = %self.project_name,
            nodes = artifact.nodes.len(),
            edges = artifact.edges.len(),
            "declared graph"
        );
        artifact
    }
}
