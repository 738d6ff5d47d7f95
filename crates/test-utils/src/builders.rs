#![allow(dead_code)]

use std::path::PathBuf;

use dagship::config::{BatchSection, ConfigFile, ConfigSection, RawConfigFile, SchedulerSection, TaskConfig};
use dagship::dag::{Graph, Node};
use dagship::types::BackendKind;

/// Builder for `Graph` to simplify test setup.
///
/// Nodes default to `needs_execution = true` and no products.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, name: &str, upstream: &[&str]) -> Self {
        self.nodes
            .push(Node::new(name).with_upstream(upstream.iter().copied()));
        self
    }

    pub fn stale(self, name: &str, upstream: &[&str]) -> Self {
        self.node(name, upstream)
    }

    pub fn fresh(mut self, name: &str, upstream: &[&str]) -> Self {
        self.nodes.push(
            Node::new(name)
                .with_upstream(upstream.iter().copied())
                .with_needs_execution(false),
        );
        self
    }

    /// Attach products to the most recently added node.
    pub fn products(mut self, products: &[&str]) -> Self {
        if let Some(last) = self.nodes.last_mut() {
            last.products = products.iter().map(PathBuf::from).collect();
        }
        self
    }

    pub fn push(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn build(self) -> Graph {
        Graph::build(self.nodes).expect("Failed to build valid graph from builder")
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                batch: None,
                scheduler: SchedulerSection::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.config.config.workspace = PathBuf::from(workspace);
        self
    }

    pub fn with_batch(mut self, batch: BatchSection) -> Self {
        self.config.config.backend = BackendKind::Batch;
        self.config.batch = Some(batch);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            task: TaskConfig::new(name),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn product(mut self, path: &str) -> Self {
        self.task.products.push(PathBuf::from(path));
        self
    }

    pub fn source(mut self, pattern: &str) -> Self {
        self.task.source.push(pattern.to_string());
        self
    }

    pub fn needs_execution(mut self, val: bool) -> Self {
        self.task.needs_execution = Some(val);
        self
    }

    pub fn command(mut self, argv: &[&str]) -> Self {
        self.task.command = Some(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
