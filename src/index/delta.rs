//! What the persistent index must change after a batch.

use rustc_hash::FxHashSet;

use super::ParsingOutput;
use crate::engine::{ModuleHandle, TypeHandle};

/// Type-level changes handed to the storage layer.
///
/// A type that disappeared from one unit and appeared in another within
/// the same accumulator counts as changed, not as removed plus added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexDelta {
    pub added: FxHashSet<TypeHandle>,
    pub removed: FxHashSet<TypeHandle>,
    pub changed: FxHashSet<TypeHandle>,
    pub added_module: Option<ModuleHandle>,
}

impl IndexDelta {
    pub fn compute(output: &ParsingOutput) -> Self {
        let added_types = output.added_types();
        let removed_types = output.removed_types();

        let added = added_types.difference(removed_types).cloned().collect();
        let removed = removed_types.difference(added_types).cloned().collect();
        let changed = added_types
            .intersection(removed_types)
            .chain(output.modified_types().iter())
            .cloned()
            .collect();

        // Only one module descriptor can exist per batch.
        let added_module = output.added_modules().iter().min().cloned();

        Self {
            added,
            removed,
            changed,
            added_module,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.added_module.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::UnitId;
    use crate::engine::Checksum;
    use crate::index::UnitResult;

    fn ty(name: &str) -> TypeHandle {
        TypeHandle::new(name)
    }

    #[test]
    fn test_moved_type_is_changed() {
        let mut previous = ParsingOutput::new();
        previous.commit(UnitResult::classify(None, UnitId::new(0), vec![ty("p.A"), ty("p.Moved")], Checksum(1), false));
        previous.commit(UnitResult::classify(None, UnitId::new(1), vec![ty("p.B")], Checksum(2), false));

        // Second batch: p.Moved leaves unit 0 and shows up in unit 1.
        let mut next = ParsingOutput::new();
        next.commit(UnitResult::classify(Some(&previous), UnitId::new(0), vec![ty("p.A")], Checksum(3), false));
        next.commit(UnitResult::classify(Some(&previous), UnitId::new(1), vec![ty("p.B"), ty("p.Moved")], Checksum(4), false));

        let delta = IndexDelta::compute(&next);
        assert!(delta.changed.contains(&ty("p.Moved")));
        assert!(delta.changed.contains(&ty("p.A")));
        assert!(delta.changed.contains(&ty("p.B")));
        assert!(delta.added.is_empty());
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn test_plain_removal_and_module() {
        let mut previous = ParsingOutput::new();
        previous.commit(UnitResult::classify(None, UnitId::new(0), vec![ty("p.A"), ty("p.Old")], Checksum(1), false));

        let mut next = ParsingOutput::new();
        next.commit(
            UnitResult::classify(Some(&previous), UnitId::new(0), vec![ty("p.A")], Checksum(1), false)
                .with_modules(vec![ModuleHandle("m".into())]),
        );

        let delta = IndexDelta::compute(&next);
        assert_eq!(delta.removed.len(), 1);
        assert!(delta.removed.contains(&ty("p.Old")));
        assert!(delta.changed.is_empty());
        assert_eq!(delta.added_module, Some(ModuleHandle("m".into())));
        assert!(!delta.is_empty());
        assert!(IndexDelta::compute(&ParsingOutput::new()).is_empty());
    }
}
