//! The accumulated result of compiling batches.

use std::path::PathBuf;

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

use super::FqnIndex;
use crate::base::UnitId;
use crate::engine::{Checksum, ModuleHandle, ModuleName, TypeHandle};

/// Index state produced by a batch, and the `previous` input of the next.
///
/// Workers never mutate a caller's accumulator: they start from a copy
/// ([`ParsingOutput::starting_from`]) and fold per-unit results in at
/// checkpoints ([`ParsingOutput::commit`]). All sets only grow. The FQN
/// entry and checksum of a reprocessed unit are replaced.
///
/// `added_types` and `modified_types` never share an element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsingOutput {
    fqns: FqnIndex,
    added_types: FxHashSet<TypeHandle>,
    modified_types: FxHashSet<TypeHandle>,
    removed_types: FxHashSet<TypeHandle>,
    added_modules: FxHashSet<ModuleHandle>,
    created_files: FxHashSet<PathBuf>,
    finished: FxHashSet<UnitId>,
    apt_generated: IndexSet<PathBuf>,
    checksums: FxHashMap<UnitId, Checksum>,
    units_with_errors: FxHashSet<UnitId>,
    broken: FxHashSet<UnitId>,
    module_name: Option<ModuleName>,
}

/// Everything one finished unit contributes. Built in full before it is
/// committed, so an early return never leaves half a unit behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitResult {
    pub unit: UnitId,
    pub fqns: Vec<TypeHandle>,
    pub checksum: Checksum,
    pub added_types: Vec<TypeHandle>,
    pub modified_types: Vec<TypeHandle>,
    pub removed_types: Vec<TypeHandle>,
    pub added_modules: Vec<ModuleHandle>,
    pub has_errors: bool,
}

impl UnitResult {
    /// Apply the checksum gate to one analyzed unit.
    ///
    /// With no committed checksum for `unit` in `previous` every type is
    /// added. Otherwise types missing from the committed FQN entry are
    /// added, types no longer declared are removed, and the remaining
    /// types are modified only if the checksum changed or `force_modified`
    /// is set (supplementary indexing).
    pub fn classify(
        previous: Option<&ParsingOutput>,
        unit: UnitId,
        types: Vec<TypeHandle>,
        checksum: Checksum,
        force_modified: bool,
    ) -> Self {
        let mut result = Self {
            unit,
            fqns: types,
            checksum,
            added_types: Vec::new(),
            modified_types: Vec::new(),
            removed_types: Vec::new(),
            added_modules: Vec::new(),
            has_errors: false,
        };

        let prior = previous.and_then(|p| {
            p.checksums
                .get(&unit)
                .map(|&sum| (sum, p.fqns.get(unit)))
        });

        match prior {
            None => result.added_types = result.fqns.clone(),
            Some((prior_sum, prior_names)) => {
                let changed = prior_sum != checksum || force_modified;
                for ty in &result.fqns {
                    let known = prior_names.is_some_and(|names| names.contains(ty));
                    if !known {
                        result.added_types.push(ty.clone());
                    } else if changed {
                        result.modified_types.push(ty.clone());
                    }
                }
                if let Some(names) = prior_names {
                    result.removed_types = names
                        .iter()
                        .filter(|ty| !result.fqns.contains(ty))
                        .cloned()
                        .collect();
                }
            }
        }
        result
    }

    pub fn with_modules(mut self, modules: Vec<ModuleHandle>) -> Self {
        self.added_modules = modules;
        self
    }

    pub fn with_errors(mut self, has_errors: bool) -> Self {
        self.has_errors = has_errors;
        self
    }
}

impl ParsingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// A private copy of `previous` to accumulate into.
    pub fn starting_from(previous: Option<&ParsingOutput>) -> Self {
        previous.cloned().unwrap_or_default()
    }

    /// The persistent part of this output: FQN entries, checksums and the
    /// module name. Change sets, created files and unit status start empty,
    /// as at the beginning of a new indexing session.
    pub fn baseline(&self) -> Self {
        Self {
            fqns: self.fqns.clone(),
            checksums: self.checksums.clone(),
            module_name: self.module_name.clone(),
            ..Self::default()
        }
    }

    // ========================================================================
    // CHECKPOINTS
    // ========================================================================

    /// Record the names a freshly parsed unit declares, before it is analyzed.
    pub fn record_fqns(&mut self, unit: UnitId, names: impl IntoIterator<Item = TypeHandle>) {
        self.fqns.set(unit, names);
    }

    /// Fold a finished unit in and mark it finished.
    pub fn commit(&mut self, result: UnitResult) {
        let UnitResult {
            unit,
            fqns,
            checksum,
            added_types,
            modified_types,
            removed_types,
            added_modules,
            has_errors,
        } = result;

        self.fqns.set(unit, fqns);
        self.checksums.insert(unit, checksum);
        for ty in added_types {
            self.add_type(ty);
        }
        for ty in modified_types {
            self.modify_type(ty);
        }
        self.removed_types.extend(removed_types);
        self.added_modules.extend(added_modules);
        if has_errors {
            self.units_with_errors.insert(unit);
        }
        self.finished.insert(unit);
    }

    fn add_type(&mut self, ty: TypeHandle) {
        self.modified_types.remove(&ty);
        self.added_types.insert(ty);
    }

    fn modify_type(&mut self, ty: TypeHandle) {
        if !self.added_types.contains(&ty) {
            self.modified_types.insert(ty);
        }
    }

    pub fn record_created(&mut self, files: impl IntoIterator<Item = PathBuf>) {
        self.created_files.extend(files);
    }

    pub fn record_apt_generated(&mut self, files: impl IntoIterator<Item = PathBuf>) {
        self.apt_generated.extend(files);
    }

    /// Hand the annotation-processor sources to the next round.
    pub fn take_apt_generated(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.apt_generated).into_iter().collect()
    }

    pub fn mark_broken(&mut self, units: impl IntoIterator<Item = UnitId>) {
        self.broken.extend(units);
    }

    pub fn set_module_name(&mut self, name: ModuleName) {
        self.module_name = Some(name);
    }

    // ========================================================================
    // MERGE
    // ========================================================================

    /// `previous` combined with `this_run`.
    ///
    /// Sets are unioned; FQN entries and checksums of units in `this_run`
    /// replace those of `previous`; the module name of `this_run` wins when
    /// it has one. Neither input is modified.
    pub fn merge(previous: &ParsingOutput, this_run: &ParsingOutput) -> ParsingOutput {
        let mut combined = previous.clone();
        combined.fqns.overlay(&this_run.fqns);
        combined
            .checksums
            .extend(this_run.checksums.iter().map(|(&u, &c)| (u, c)));
        for ty in &this_run.added_types {
            combined.add_type(ty.clone());
        }
        for ty in &this_run.modified_types {
            combined.modify_type(ty.clone());
        }
        combined
            .removed_types
            .extend(this_run.removed_types.iter().cloned());
        combined
            .added_modules
            .extend(this_run.added_modules.iter().cloned());
        combined
            .created_files
            .extend(this_run.created_files.iter().cloned());
        combined.finished.extend(this_run.finished.iter().copied());
        combined
            .apt_generated
            .extend(this_run.apt_generated.iter().cloned());
        combined
            .units_with_errors
            .extend(this_run.units_with_errors.iter().copied());
        combined.broken.extend(this_run.broken.iter().copied());
        if let Some(name) = &this_run.module_name {
            combined.module_name = Some(name.clone());
        }
        combined
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn fqns(&self) -> &FqnIndex {
        &self.fqns
    }

    pub fn added_types(&self) -> &FxHashSet<TypeHandle> {
        &self.added_types
    }

    pub fn modified_types(&self) -> &FxHashSet<TypeHandle> {
        &self.modified_types
    }

    pub fn removed_types(&self) -> &FxHashSet<TypeHandle> {
        &self.removed_types
    }

    pub fn added_modules(&self) -> &FxHashSet<ModuleHandle> {
        &self.added_modules
    }

    pub fn created_files(&self) -> &FxHashSet<PathBuf> {
        &self.created_files
    }

    pub fn finished(&self) -> &FxHashSet<UnitId> {
        &self.finished
    }

    pub fn is_finished(&self, unit: UnitId) -> bool {
        self.finished.contains(&unit)
    }

    pub fn apt_generated(&self) -> &IndexSet<PathBuf> {
        &self.apt_generated
    }

    pub fn checksum(&self, unit: UnitId) -> Option<Checksum> {
        self.checksums.get(&unit).copied()
    }

    pub fn units_with_errors(&self) -> &FxHashSet<UnitId> {
        &self.units_with_errors
    }

    pub fn broken(&self) -> &FxHashSet<UnitId> {
        &self.broken
    }

    pub fn module_name(&self) -> Option<&ModuleName> {
        self.module_name.as_ref()
    }
}

#[cfg(feature = "persist")]
impl ParsingOutput {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
