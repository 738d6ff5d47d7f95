// src/validate.rs

//! Pre-submission validation pass.
//!
//! Runs against the *unfiltered* graph so that a misplaced product is
//! reported even for nodes that will not run this time. Every check is
//! evaluated for every product; all violations come back in one
//! [`ValidationError`], in node declaration order.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::dag::Graph;
use crate::errors::{ValidationError, Violation};
use crate::fs::FileSystem;

/// Explicit context for resolving product paths. Nothing is read from the
/// process environment (no implicit current directory).
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Directory that relative product paths are relative to.
    pub base_dir: PathBuf,
    /// Orchestration workspace; may be relative to `base_dir`.
    pub workspace_root: PathBuf,
    /// Reject relative product paths (the backend may run from an
    /// unpredictable working directory).
    pub require_absolute_products: bool,
}

impl ValidationContext {
    pub fn new(base_dir: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            workspace_root: workspace_root.into(),
            require_absolute_products: false,
        }
    }

    pub fn require_absolute_products(mut self, require: bool) -> Self {
        self.require_absolute_products = require;
        self
    }
}

pub fn validate(
    graph: &Graph,
    ctx: &ValidationContext,
    fs: &dyn FileSystem,
) -> Result<(), ValidationError> {
    let workspace = resolve_path(fs, &ctx.base_dir, &ctx.workspace_root);
    let mut violations = Vec::new();

    for node in graph.nodes() {
        for product in node.products.iter() {
            if ctx.require_absolute_products && !product.is_absolute() {
                violations.push(Violation {
                    node: node.name.clone(),
                    message: format!(
                        "product {} is a relative path; use an absolute path since the backend may run from any working directory",
                        product.display()
                    ),
                });
            }

            let resolved = resolve_path(fs, &ctx.base_dir, product);
            if resolved.starts_with(&workspace) {
                violations.push(Violation {
                    node: node.name.clone(),
                    message: format!(
                        "product {} resolves to {}, inside the workspace {}; save it outside the workspace",
                        product.display(),
                        resolved.display(),
                        workspace.display()
                    ),
                });
            }
        }
    }

    if violations.is_empty() {
        debug!(nodes = graph.len(), "validation passed");
        Ok(())
    } else {
        warn!(violations = violations.len(), "validation failed");
        Err(ValidationError { violations })
    }
}

/// Resolve `path` against `base` the way the filesystem would.
///
/// `.` and `..` are folded lexically, then the deepest ancestor that
/// exists is canonicalized so symbolic links are followed even when the
/// product itself has not been written yet.
pub fn resolve_path(fs: &dyn FileSystem, base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let normalized = normalize(&joined);

    for ancestor in normalized.ancestors() {
        if ancestor.as_os_str().is_empty() || !fs.exists(ancestor) {
            continue;
        }
        return match fs.canonicalize(ancestor) {
            Ok(real) => {
                let rest = normalized.strip_prefix(ancestor).unwrap_or(Path::new(""));
                if rest.as_os_str().is_empty() {
                    real
                } else {
                    real.join(rest)
                }
            }
            Err(err) => {
                debug!(path = ?ancestor, error = %err, "cannot canonicalize; using lexical path");
                normalized
            }
        };
    }

    normalized
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/../../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("../../x")), PathBuf::from("../../x"));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let fs = MockFileSystem::new();
        let resolved = resolve_path(&fs, Path::new("/project"), Path::new("out/../data.csv"));
        assert_eq!(resolved, PathBuf::from("/project/data.csv"));
    }

    #[test]
    fn symlinked_ancestor_is_followed() {
        let fs = MockFileSystem::new();
        fs.add_symlink("/data/link", "/project/dist");

        let resolved = resolve_path(&fs, Path::new("/project"), Path::new("/data/link/out.csv"));
        assert_eq!(resolved, PathBuf::from("/project/dist/out.csv"));
    }
}
