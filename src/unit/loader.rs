//! Reading the text of source units.

use std::io;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::SourceUnit;
use crate::base::UnitId;

/// Reads the text of a unit.
///
/// `Ok(None)` means the unit no longer exists (for example it was deleted
/// after the batch was assembled); workers skip such units silently.
pub trait SourceLoader: Send + Sync {
    fn load(&self, unit: &SourceUnit) -> io::Result<Option<Arc<str>>>;
}

/// Loads units from the file system by their path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSourceLoader;

impl SourceLoader for FsSourceLoader {
    fn load(&self, unit: &SourceUnit) -> io::Result<Option<Arc<str>>> {
        match std::fs::read_to_string(unit.path()) {
            Ok(text) => Ok(Some(Arc::from(text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Serves text from memory, e.g. unsaved editor buffers.
#[derive(Debug, Default)]
pub struct MemorySourceLoader {
    texts: RwLock<FxHashMap<UnitId, Arc<str>>>,
}

impl MemorySourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, unit: UnitId, text: impl Into<Arc<str>>) {
        self.texts.write().insert(unit, text.into());
    }

    pub fn remove(&self, unit: UnitId) -> Option<Arc<str>> {
        self.texts.write().remove(&unit)
    }
}

impl SourceLoader for MemorySourceLoader {
    fn load(&self, unit: &SourceUnit) -> io::Result<Option<Arc<str>>> {
        Ok(self.texts.read().get(&unit.id()).cloned())
    }
}
