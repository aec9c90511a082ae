//! The compiler engine contract.
//!
//! The pipeline never parses or type-checks anything itself. It sequences
//! calls into an engine supplied by the host:
//!
//! ```text
//! parse(unit) → ParsedUnit
//! enter(parsed units) → declared elements
//! analyze(declared elements)
//! generate(declared elements) → artifacts
//! ```
//!
//! An engine instance carries symbol tables shared by every unit entered
//! into it, so it is owned by one worker at a time through a
//! [`CompilerEngineHandle`] and thrown away whenever its state is suspect.

mod diagnostics;
mod handle;
mod ids;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::base::UnitId;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::unit::SourceUnit;

pub use diagnostics::{
    Diagnostic, DiagnosticCollector, DiagnosticCounter, DiagnosticListener, NullDiagnostics,
    Severity,
};
pub use handle::CompilerEngineHandle;
pub use ids::{Checksum, DeclaredElement, ElementKind, ModuleHandle, ModuleName, TypeHandle};

/// The engine's parse tree for one unit, paired back to the unit.
#[derive(Debug)]
pub struct ParsedUnit<T> {
    pub unit: SourceUnit,
    /// Top-level type names visible from syntax alone.
    pub declared: Vec<TypeHandle>,
    pub tree: T,
}

/// One output file produced by `generate`, not yet written.
#[derive(Clone, Debug)]
pub struct GeneratedArtifact {
    pub unit: UnitId,
    /// Path relative to the output root.
    pub relative_path: PathBuf,
    pub bytes: Arc<[u8]>,
}

/// Supertype queries used to order units within a batch.
pub trait TypeGraph {
    /// Direct supertypes of `ty` (superclass and interfaces).
    fn supertypes(&self, ty: &TypeHandle) -> Vec<TypeHandle>;

    /// The unit declaring the outermost class of `ty`, if the engine knows
    /// its source.
    fn declaring_unit(&self, ty: &TypeHandle) -> Option<UnitId>;

    /// Member types declared inside `ty`.
    fn nested_types(&self, _ty: &TypeHandle) -> Vec<TypeHandle> {
        Vec::new()
    }
}

/// One instance of the external compiler front end.
pub trait CompilerEngine: TypeGraph {
    /// Opaque parse tree.
    type Tree;

    fn parse(&mut self, unit: &SourceUnit, text: &str) -> EngineResult<ParsedUnit<Self::Tree>>;

    /// Register the symbols of `units`. Declarations of every unit in one
    /// call are visible to each other.
    fn enter(&mut self, units: &[ParsedUnit<Self::Tree>]) -> EngineResult<Vec<DeclaredElement>>;

    /// Fully check the bodies of entered elements.
    fn analyze(&mut self, elements: &[DeclaredElement]) -> EngineResult<()>;

    /// Fingerprint of the externally visible API of `elements`.
    fn checksum(&self, elements: &[DeclaredElement]) -> Checksum;

    fn generate(&mut self, elements: &[DeclaredElement]) -> EngineResult<Vec<GeneratedArtifact>>;

    /// The module that owns `unit`.
    fn owning_module(&self, unit: UnitId) -> ModuleName;

    /// Source files annotation processors produced while analyzing `unit`.
    fn take_apt_generated(&mut self, _unit: UnitId) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Creates engine instances.
pub trait EngineFactory: Send + Sync {
    type Engine: CompilerEngine;

    fn create(
        &self,
        config: &EngineConfig,
        diagnostics: Arc<dyn DiagnosticListener>,
        cancel: CancellationToken,
    ) -> EngineResult<Self::Engine>;
}
