//! Which fully-qualified type names each unit declares.

use indexmap::{IndexMap, IndexSet};

use crate::base::UnitId;
use crate::engine::TypeHandle;

/// Map from unit to the type names it declares.
///
/// Entries are replaced, never merged: a reprocessed unit declares exactly
/// what its latest tree declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct FqnIndex {
    units: IndexMap<UnitId, IndexSet<TypeHandle>>,
}

impl FqnIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry of `unit`, returning the old one.
    pub fn set(
        &mut self,
        unit: UnitId,
        names: impl IntoIterator<Item = TypeHandle>,
    ) -> Option<IndexSet<TypeHandle>> {
        self.units.insert(unit, names.into_iter().collect())
    }

    pub fn get(&self, unit: UnitId) -> Option<&IndexSet<TypeHandle>> {
        self.units.get(&unit)
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.units.contains_key(&unit)
    }

    /// Units whose entry lists `ty`.
    pub fn units_declaring<'a>(&'a self, ty: &'a TypeHandle) -> impl Iterator<Item = UnitId> + 'a {
        self.units
            .iter()
            .filter(move |(_, names)| names.contains(ty))
            .map(|(&unit, _)| unit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &IndexSet<TypeHandle>)> + '_ {
        self.units.iter().map(|(&unit, names)| (unit, names))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Fold `other` in; its entries win.
    pub(crate) fn overlay(&mut self, other: &FqnIndex) {
        for (unit, names) in other.iter() {
            self.units.insert(unit, names.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<TypeHandle> {
        list.iter().map(|n| TypeHandle::new(n)).collect()
    }

    #[test]
    fn test_set_replaces_entry() {
        let mut index = FqnIndex::new();
        let unit = UnitId::new(0);

        assert!(index.set(unit, names(&["p.A", "p.A$Inner"])).is_none());
        let old = index.set(unit, names(&["p.A"])).unwrap();

        assert_eq!(old.len(), 2);
        assert_eq!(index.get(unit).unwrap().len(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_units_declaring() {
        let mut index = FqnIndex::new();
        index.set(UnitId::new(0), names(&["p.A"]));
        index.set(UnitId::new(1), names(&["p.B", "p.A"]));
        index.set(UnitId::new(2), names(&["p.C"]));

        let ty = TypeHandle::new("p.A");
        let units: Vec<_> = index.units_declaring(&ty).collect();
        assert_eq!(units, vec![UnitId::new(0), UnitId::new(1)]);
    }

    #[test]
    fn test_overlay_prefers_other() {
        let mut base = FqnIndex::new();
        base.set(UnitId::new(0), names(&["p.Old"]));
        base.set(UnitId::new(1), names(&["p.Kept"]));

        let mut newer = FqnIndex::new();
        newer.set(UnitId::new(0), names(&["p.New"]));

        base.overlay(&newer);
        assert!(base.get(UnitId::new(0)).unwrap().contains(&TypeHandle::new("p.New")));
        assert!(base.get(UnitId::new(1)).is_some());
        assert!(base.contains(UnitId::new(1)));
        assert!(!base.contains(UnitId::new(2)));
    }
}
