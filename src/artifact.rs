//! Where generated artifacts are written.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::engine::GeneratedArtifact;

/// Persists generated artifacts. Called from generation threads.
pub trait ArtifactStore: Send + Sync {
    /// Write one artifact. Returns the file's location when the write
    /// created a file that did not exist before.
    fn write(&self, artifact: &GeneratedArtifact) -> io::Result<Option<PathBuf>>;
}

/// Writes artifacts below an output root on disk.
#[derive(Clone, Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, artifact: &GeneratedArtifact) -> io::Result<Option<PathBuf>> {
        let target = self.root.join(&artifact.relative_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let existed = target.exists();
        std::fs::write(&target, &artifact.bytes)?;
        Ok((!existed).then_some(target))
    }
}

/// Keeps artifacts in memory, keyed by relative path.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    files: RwLock<FxHashMap<PathBuf, Arc<[u8]>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relative_path: &Path) -> Option<Arc<[u8]>> {
        self.files.read().get(relative_path).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn write(&self, artifact: &GeneratedArtifact) -> io::Result<Option<PathBuf>> {
        let previous = self
            .files
            .write()
            .insert(artifact.relative_path.clone(), Arc::clone(&artifact.bytes));
        Ok(previous
            .is_none()
            .then(|| artifact.relative_path.clone()))
    }
}
