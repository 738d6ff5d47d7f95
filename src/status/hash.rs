// src/status/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::dag::NodeName;
use crate::fs::FileSystem;

/// Relative path (from the workspace root) to the fingerprints file.
pub const FINGERPRINT_FILE_PATH: &str = ".dagship/fingerprints";

pub fn fingerprint_file_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(FINGERPRINT_FILE_PATH)
}

/// Hash of a single file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Deterministic hash over the given files.
///
/// Paths are sorted first so the order they are passed in does not matter.
/// The path relative to `root` is mixed in, so renaming a file changes the
/// fingerprint.
pub fn compute_hash_for_paths(fs: &dyn FileSystem, root: &Path, paths: &[PathBuf]) -> Result<String> {
    let mut hasher = Hasher::new();

    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    for path in sorted {
        let rel = path.strip_prefix(root).unwrap_or(path);
        let file_hash = compute_file_hash(fs, path)?;
        hasher.update(rel.to_string_lossy().replace('\\', "/").as_bytes());
        hasher.update(b"\0");
        hasher.update(file_hash.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = paths.len(), "computed aggregate hash");
    Ok(hash)
}

/// Storage for the fingerprints recorded at the last delivered run.
pub trait HashStore: Send + Sync {
    fn load(&self, node: &str) -> Result<Option<String>>;
    fn save(&mut self, node: &str, hash: &str) -> Result<()>;
    /// Remove fingerprints of nodes that are not in `active`.
    fn prune(&mut self, active: &[&str]) -> Result<()>;
}

/// Stores fingerprints in `<workspace>/.dagship/fingerprints`, one
/// `name hash` pair per line.
pub struct FileHashStore<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
}

impl<'a> FileHashStore<'a> {
    pub fn new(fs: &'a dyn FileSystem, workspace_root: &Path) -> Self {
        Self {
            fs,
            path: fingerprint_file_path(workspace_root),
        }
    }

    fn load_all(&self) -> Result<HashMap<NodeName, String>> {
        if !self.fs.exists(&self.path) {
            return Ok(HashMap::new());
        }

        let contents = self.fs.read_to_string(&self.path)?;
        let mut map = HashMap::new();

        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some((name, hash)) = trimmed.split_once(char::is_whitespace) {
                map.insert(name.to_string(), hash.trim().to_string());
            }
        }

        Ok(map)
    }

    fn save_all(&self, map: &HashMap<NodeName, String>) -> Result<()> {
        let mut entries: Vec<_> = map.iter().collect();
        entries.sort();

        let mut out = String::new();
        for (name, hash) in entries {
            out.push_str(name);
            out.push(' ');
            out.push_str(hash);
            out.push('\n');
        }

        self.fs
            .write(&self.path, out.as_bytes())
            .with_context(|| format!("writing fingerprints to {:?}", self.path))
    }
}

impl HashStore for FileHashStore<'_> {
    fn load(&self, node: &str) -> Result<Option<String>> {
        Ok(self.load_all()?.get(node).cloned())
    }

    fn save(&mut self, node: &str, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(node.to_string(), hash.to_string());
        self.save_all(&map)?;
        debug!(node = %node, hash = %hash, "stored fingerprint (file)");
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        let mut map = self.load_all()?;
        let initial_len = map.len();
        map.retain(|k, _| active.contains(&k.as_str()));

        if map.len() < initial_len {
            self.save_all(&map)?;
            info!(removed = initial_len - map.len(), "pruned stale fingerprints (file)");
        }
        Ok(())
    }
}

/// Stores fingerprints in memory only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<NodeName, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, node: &str) -> Result<Option<String>> {
        Ok(self.map.get(node).cloned())
    }

    fn save(&mut self, node: &str, hash: &str) -> Result<()> {
        self.map.insert(node.to_string(), hash.to_string());
        debug!(node = %node, hash = %hash, "stored fingerprint (memory)");
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        let initial_len = self.map.len();
        self.map.retain(|k, _| active.contains(&k.as_str()));
        if self.map.len() < initial_len {
            info!(removed = initial_len - self.map.len(), "pruned stale fingerprints (memory)");
        }
        Ok(())
    }
}
