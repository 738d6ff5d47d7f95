// src/status/sources.rs

//! Compiled `source` globs for one task.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;

#[derive(Clone)]
pub struct SourcePatterns {
    task: String,
    set: GlobSet,
}

impl fmt::Debug for SourcePatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcePatterns")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

impl SourcePatterns {
    pub fn new(task: &str, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat)
                .with_context(|| format!("invalid source pattern for task {task}: {pat}"))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .with_context(|| format!("building source globset for task {task}"))?;

        Ok(Self {
            task: task.to_string(),
            set,
        })
    }

    /// `rel_path` is relative to the project root, with forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    /// Every file under `root` matching these patterns. Directories in
    /// `skip` (typically the workspace) are not descended into.
    pub fn collect(&self, fs: &dyn FileSystem, root: &Path, skip: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    if !skip.iter().any(|s| path.starts_with(s)) {
                        stack.push(path);
                    }
                } else if fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(root) {
                        let rel_str = rel.to_string_lossy().replace('\\', "/");
                        if self.matches(&rel_str) {
                            files.push(path);
                        }
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
