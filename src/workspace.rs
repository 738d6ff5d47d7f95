// src/workspace.rs

//! Copies the project sources into the workspace so a scheduler host can
//! run the declared commands against a frozen tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Directory names never copied.
const ALWAYS_SKIPPED: &[&str] = &[".git"];

/// `<workspace>/project/<name>`
pub fn project_copy_dir(workspace_root: &Path, project_name: &str) -> PathBuf {
    workspace_root.join("project").join(project_name)
}

/// Copy every file under `project_root` to `dest`, preserving the relative
/// layout. `workspace_root` is skipped (the destination usually lives inside
/// it, and copying it would recurse forever). Returns the number of files
/// copied.
pub fn copy_project(
    fs: &dyn FileSystem,
    project_root: &Path,
    workspace_root: &Path,
    dest: &Path,
) -> Result<usize> {
    let mut copied = 0;
    let mut stack = vec![project_root.to_path_buf()];

    fs.create_dir_all(dest)?;

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                let skipped = path.starts_with(workspace_root)
                    || path.starts_with(dest)
                    || path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| ALWAYS_SKIPPED.contains(&n));
                if skipped {
                    debug!(dir = ?path, "not copying directory");
                } else {
                    stack.push(path);
                }
            } else if fs.is_file(&path) {
                let rel = path
                    .strip_prefix(project_root)
                    .with_context(|| format!("{:?} is outside {:?}", path, project_root))?;
                fs.copy(&path, &dest.join(rel))?;
                copied += 1;
            }
        }
    }

    info!(files = copied, dest = ?dest, "copied project sources into workspace");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn copies_sources_but_not_workspace_or_git() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/pipeline.yaml", b"tasks: []");
        fs.add_file("/p/tasks/load.py", b"print('load')");
        fs.add_file("/p/.git/HEAD", b"ref: main");
        fs.add_file("/p/dist/dags/old.toml", b"name = 'old'");

        let ws = Path::new("/p/dist");
        let dest = project_copy_dir(ws, "etl");
        let copied = copy_project(&fs, Path::new("/p"), ws, &dest).unwrap();

        assert_eq!(copied, 2);
        assert!(fs.is_file(Path::new("/p/dist/project/etl/pipeline.yaml")));
        assert!(fs.is_file(Path::new("/p/dist/project/etl/tasks/load.py")));
        assert!(!fs.exists(Path::new("/p/dist/project/etl/.git/HEAD")));
        assert!(!fs.exists(Path::new("/p/dist/project/etl/dist")));
    }
}
