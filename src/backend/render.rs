// src/backend/render.rs

//! Writes a [`DeclarationArtifact`] to disk for the scheduler host.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::backend::DeclarationArtifact;
use crate::fs::FileSystem;

/// Directory (relative to the workspace root) scanned by the scheduler host.
pub const DECLARATION_DIR: &str = "dags";

/// `<workspace>/dags/<name>.toml`
pub fn declaration_path(workspace_root: &Path, name: &str) -> PathBuf {
    workspace_root
        .join(DECLARATION_DIR)
        .join(format!("{name}.toml"))
}

pub fn render(artifact: &DeclarationArtifact) -> Result<String> {
    toml::to_string_pretty(artifact)
        .with_context(|| format!("rendering declaration for {}", artifact.name))
}

/// Render and write the artifact, returning the path written.
pub fn write_declaration(
    fs: &dyn FileSystem,
    workspace_root: &Path,
    artifact: &DeclarationArtifact,
) -> Result<PathBuf> {
    let path = declaration_path(workspace_root, &artifact.name);
    let contents = render(artifact)?;
    fs.write(&path, contents.as_bytes())?;
    info!(path = ?path, "wrote graph declaration");
    Ok(path)
}
