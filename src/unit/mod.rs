//! Source units and how their text reaches a worker.
//!
//! - [`SourceUnit`] - One file of a batch, immutable while the batch runs
//! - [`UnitSet`] - Stable path → [`UnitId`] assignment
//! - [`SourceLoader`] - Reads unit text (disk or memory)
//! - [`SourceUnitSupplier`] - Iterator contract workers drain, with prefetching

mod loader;
mod set;
mod supplier;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use crate::base::UnitId;

pub use loader::{FsSourceLoader, MemorySourceLoader, SourceLoader};
pub use set::UnitSet;
pub use supplier::{PREFETCH_WINDOW, PrefetchedUnit, SourcePrefetcher, SourceUnitSupplier};

/// One file to be compiled.
///
/// Identity is the [`UnitId`]; two units with the same id are the same
/// unit regardless of flags.
#[derive(Clone)]
pub struct SourceUnit {
    id: UnitId,
    path: Arc<Path>,
    is_virtual: bool,
    is_apt_generated: bool,
}

impl SourceUnit {
    pub fn new(id: UnitId, path: impl AsRef<Path>) -> Self {
        Self {
            id,
            path: Arc::from(path.as_ref()),
            is_virtual: false,
            is_apt_generated: false,
        }
    }

    /// Mark the unit as synthetic: it is compiled, but files generated
    /// from it are not reported as created.
    pub fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.is_virtual = is_virtual;
        self
    }

    /// Mark the unit as produced by annotation processing.
    pub fn with_apt_generated(mut self, is_apt_generated: bool) -> Self {
        self.is_apt_generated = is_apt_generated;
        self
    }

    #[inline]
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    #[inline]
    pub fn is_apt_generated(&self) -> bool {
        self.is_apt_generated
    }
}

impl PartialEq for SourceUnit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourceUnit {}

impl Hash for SourceUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.id, self.path.display())?;
        if self.is_virtual {
            f.write_str("[virtual]")?;
        }
        if self.is_apt_generated {
            f.write_str("[apt]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_flags() {
        let a = SourceUnit::new(UnitId::new(1), "/src/p/A.java");
        let b = a.clone().with_virtual(true).with_apt_generated(true);

        assert_eq!(a, b);
        assert!(b.is_virtual());
        assert!(b.is_apt_generated());
        assert!(!a.is_virtual());
    }

    #[test]
    fn test_debug_shows_flags() {
        let unit = SourceUnit::new(UnitId::new(2), "/gen/B.java").with_apt_generated(true);
        assert_eq!(format!("{unit:?}"), "UnitId(2)(/gen/B.java)[apt]");
    }
}
