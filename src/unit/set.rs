//! Stable identities for source units.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::SourceUnit;
use crate::base::UnitId;

/// Assigns stable [`UnitId`]s to paths.
///
/// A long-running host keeps one set for its whole lifetime so that the
/// ids stored in a persisted accumulator keep meaning the same file
/// across batches.
#[derive(Debug, Default)]
pub struct UnitSet {
    inner: RwLock<UnitSetInner>,
}

#[derive(Debug, Default)]
struct UnitSetInner {
    /// Path → UnitId mapping
    path_to_id: IndexMap<PathBuf, UnitId>,
    /// UnitId → Path mapping (reverse lookup)
    id_to_path: IndexMap<UnitId, PathBuf>,
    /// Next UnitId to assign
    next_id: u32,
}

impl UnitSet {
    /// Create a new empty unit set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a UnitId for a path.
    pub fn unit_id(&self, path: &Path) -> UnitId {
        // Fast path: read lock
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.path_to_id.get(path) {
                return id;
            }
        }

        // Slow path: write lock
        let mut inner = self.inner.write();

        // Double-check
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }

        let id = UnitId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        inner.id_to_path.insert(id, path.to_owned());
        id
    }

    /// A plain source unit for `path`.
    pub fn unit(&self, path: impl AsRef<Path>) -> SourceUnit {
        let path = path.as_ref();
        SourceUnit::new(self.unit_id(path), path)
    }

    /// Get the path for a UnitId.
    pub fn path(&self, unit: UnitId) -> Option<PathBuf> {
        self.inner.read().id_to_path.get(&unit).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
