// src/status/mod.rs

//! Staleness detection: decides each task's `needs_execution` flag.
//!
//! A task is stale when
//! - it sets `needs_execution` explicitly (that value wins), or
//! - it has no `source` patterns (nothing to compare, so always stale), or
//! - the blake3 fingerprint of its source files differs from the one
//!   recorded after the last delivered run.
//!
//! Staleness is per task; a stale upstream does not make its dependents
//! stale.

pub mod hash;
pub mod sources;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::config::model::{ConfigFile, TaskConfig};
use crate::dag::NodeName;
use crate::fs::FileSystem;

pub use hash::{FileHashStore, HashStore, MemoryHashStore, FINGERPRINT_FILE_PATH};
pub use sources::SourcePatterns;

/// Result of assessing every task in a config.
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub needs_execution: HashMap<NodeName, bool>,
    /// Current fingerprints of tasks that declare `source` patterns.
    pub fingerprints: HashMap<NodeName, String>,
}

impl StatusReport {
    pub fn is_stale(&self, task: &str) -> bool {
        self.needs_execution.get(task).copied().unwrap_or(true)
    }
}

/// Computes fingerprints relative to a project root.
pub struct StatusProbe<'a> {
    fs: &'a dyn FileSystem,
    project_root: PathBuf,
    skip: Vec<PathBuf>,
}

impl<'a> StatusProbe<'a> {
    pub fn new(fs: &'a dyn FileSystem, project_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            project_root: project_root.into(),
            skip: Vec::new(),
        }
    }

    /// Do not look for sources under `dir` (e.g. the workspace).
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skip.push(dir.into());
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// `None` when the task declares no sources.
    pub fn fingerprint(&self, task: &TaskConfig) -> Result<Option<String>> {
        if task.source.is_empty() {
            return Ok(None);
        }
        let patterns = SourcePatterns::new(&task.name, &task.source)?;
        let files = patterns.collect(self.fs, &self.project_root, &self.skip)?;
        let hash = hash::compute_hash_for_paths(self.fs, &self.project_root, &files)?;
        Ok(Some(hash))
    }

    pub fn assess(&self, cfg: &ConfigFile, store: &dyn HashStore) -> Result<StatusReport> {
        let mut report = StatusReport::default();

        for task in cfg.tasks() {
            let fingerprint = self.fingerprint(task)?;

            let stale = match (task.needs_execution, fingerprint.as_deref()) {
                (Some(explicit), _) => explicit,
                (None, None) => true,
                (None, Some(current)) => store.load(&task.name)?.as_deref() != Some(current),
            };

            debug!(task = %task.name, stale, "assessed task status");
            report.needs_execution.insert(task.name.clone(), stale);
            if let Some(fp) = fingerprint {
                report.fingerprints.insert(task.name.clone(), fp);
            }
        }

        Ok(report)
    }
}

/// Record fingerprints for the delivered nodes and drop entries for tasks
/// that no longer exist.
pub fn record_delivered<'n, I>(
    store: &mut dyn HashStore,
    report: &StatusReport,
    delivered: I,
    all_tasks: &[&str],
) -> Result<()>
where
    I: IntoIterator<Item = &'n str>,
{
    for name in delivered {
        if let Some(fp) = report.fingerprints.get(name) {
            store.save(name, fp)?;
        }
    }
    store.prune(all_tasks)
}
