//! Finding same-batch units that must be analyzed first.

use rustc_hash::FxHashSet;

use crate::base::UnitId;
use crate::engine::{TypeGraph, TypeHandle};

/// Walks supertype chains to find the units a unit's types depend on.
pub struct DependencyScanner<'g, G: TypeGraph + ?Sized> {
    graph: &'g G,
}

impl<'g, G: TypeGraph + ?Sized> DependencyScanner<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// Units other than `current` declaring a transitive supertype of
    /// `types` (or of their nested types) for which `is_pending` holds,
    /// in discovery order.
    pub fn scan(
        &self,
        current: UnitId,
        types: &[TypeHandle],
        is_pending: impl Fn(UnitId) -> bool,
    ) -> Vec<UnitId> {
        let mut owned: Vec<TypeHandle> = Vec::new();
        let mut stack: Vec<TypeHandle> = types.to_vec();
        let mut seen_owned: FxHashSet<TypeHandle> = FxHashSet::default();
        while let Some(ty) = stack.pop() {
            if seen_owned.insert(ty.clone()) {
                stack.extend(self.graph.nested_types(&ty));
                owned.push(ty);
            }
        }

        let mut deps = Vec::new();
        let mut visited: FxHashSet<TypeHandle> = FxHashSet::default();
        for ty in &owned {
            let mut work: Vec<TypeHandle> = self.graph.supertypes(ty);
            work.reverse();
            while let Some(sup) = work.pop() {
                if !visited.insert(sup.clone()) {
                    continue;
                }
                if let Some(unit) = self.graph.declaring_unit(&sup) {
                    if unit != current && is_pending(unit) && !deps.contains(&unit) {
                        deps.push(unit);
                    }
                }
                let mut next = self.graph.supertypes(&sup);
                next.reverse();
                work.extend(next);
            }
        }
        deps
    }
}
