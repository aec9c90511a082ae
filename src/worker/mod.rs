//! Compile workers: strategies that drive one batch through the engine.
//!
//! Two strategies share one trait because their failure granularity differs:
//!
//! - [`BatchEnterWorker`] enters and analyzes the whole batch in one call.
//!   Cheap per unit, but one fault sinks the batch.
//! - [`IncrementalEnterWorker`] enters and analyzes one unit at a time,
//!   promoting same-batch supertypes ahead of their subtypes.
//!
//! [`WorkerSelector`] picks the order in which they are tried.

mod batch;
mod dependency;
mod generation;
mod incremental;
mod parse;
mod selector;

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::artifact::{ArtifactStore, MemoryArtifactStore};
use crate::config::PipelineConfig;
use crate::engine::{DiagnosticListener, EngineFactory, NullDiagnostics};
use crate::error::{EngineError, ErrorClass};
use crate::index::ParsingOutput;
use crate::memory::{LowMemoryProbe, NeverLowMemory};
use crate::unit::{FsSourceLoader, SourceLoader, SourceUnit};

pub use batch::BatchEnterWorker;
pub use dependency::DependencyScanner;
pub use incremental::IncrementalEnterWorker;
pub use selector::WorkerSelector;

// ============================================================================
// OUTCOME
// ============================================================================

/// How a worker run ended, with the accumulator it built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(ParsingOutput),
    /// The batch should be retried with another strategy or reported broken.
    Failure(ParsingOutput),
    /// Stopped early to free memory; finished units are committed.
    LowMemory(ParsingOutput),
    Cancelled(ParsingOutput),
}

impl Outcome {
    pub fn output(&self) -> &ParsingOutput {
        match self {
            Outcome::Success(out)
            | Outcome::Failure(out)
            | Outcome::LowMemory(out)
            | Outcome::Cancelled(out) => out,
        }
    }

    pub fn into_output(self) -> ParsingOutput {
        match self {
            Outcome::Success(out)
            | Outcome::Failure(out)
            | Outcome::LowMemory(out)
            | Outcome::Cancelled(out) => out,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

/// How a worker's run loop ended; the accumulator travels separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    Success,
    Failure,
    LowMemory,
    Cancelled,
}

impl Status {
    pub(crate) fn into_outcome(self, output: ParsingOutput) -> Outcome {
        match self {
            Status::Success => Outcome::Success(output),
            Status::Failure => Outcome::Failure(output),
            Status::LowMemory => Outcome::LowMemory(output),
            Status::Cancelled => Outcome::Cancelled(output),
        }
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Everything a worker needs besides the units themselves.
pub struct BatchContext<'a, F: EngineFactory> {
    pub factory: &'a F,
    pub config: &'a PipelineConfig,
    pub loader: Arc<dyn SourceLoader>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub diagnostics: Arc<dyn DiagnosticListener>,
    pub memory: Arc<dyn LowMemoryProbe>,
    pub cancel: CancellationToken,
    /// Reindexing dependents of changed files: known types always count
    /// as modified.
    pub supplementary: bool,
}

impl<'a, F: EngineFactory> BatchContext<'a, F> {
    /// A context that reads sources from disk and keeps artifacts in memory.
    pub fn new(factory: &'a F, config: &'a PipelineConfig) -> Self {
        Self {
            factory,
            config,
            loader: Arc::new(FsSourceLoader),
            artifacts: Arc::new(MemoryArtifactStore::new()),
            diagnostics: Arc::new(NullDiagnostics),
            memory: Arc::new(NeverLowMemory),
            cancel: CancellationToken::new(),
            supplementary: false,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticListener>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn LowMemoryProbe>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_supplementary(mut self, supplementary: bool) -> Self {
        self.supplementary = supplementary;
        self
    }

    /// Status to stop with before the next phase, if any.
    pub(crate) fn interrupted(&self) -> Option<Status> {
        if self.cancel.is_cancelled() {
            Some(Status::Cancelled)
        } else if self.memory.is_low_memory() {
            Some(Status::LowMemory)
        } else {
            None
        }
    }
}

// ============================================================================
// WORKER TRAIT
// ============================================================================

/// The built-in strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    BatchEnter,
    IncrementalEnter,
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerKind::BatchEnter => "batch-enter",
            WorkerKind::IncrementalEnter => "incremental-enter",
        })
    }
}

/// One strategy for compiling a batch.
pub trait CompileWorker<F: EngineFactory> {
    fn kind(&self) -> WorkerKind;

    /// Compile `units` starting from a copy of `previous`.
    fn compile(
        &self,
        previous: Option<&ParsingOutput>,
        ctx: &BatchContext<'_, F>,
        units: &[SourceUnit],
    ) -> Outcome;
}

/// Map an engine error that escaped a phase onto the run's status.
///
/// A missing platform marks every unit of the batch broken so tooling can
/// show why nothing got indexed.
pub(crate) fn status_for_error<F: EngineFactory>(
    err: EngineError,
    ctx: &BatchContext<'_, F>,
    units: &[SourceUnit],
    output: &mut ParsingOutput,
) -> Status {
    match err.class() {
        ErrorClass::Cancelled => Status::Cancelled,
        ErrorClass::LowMemory => {
            warn!("compiler engine ran out of memory");
            Status::LowMemory
        }
        ErrorClass::BrokenPlatform => {
            warn!(error = %err, units = units.len(), "missing compilation platform, marking units broken");
            output.mark_broken(units.iter().map(SourceUnit::id));
            Status::Failure
        }
        ErrorClass::Structural => {
            match &err {
                EngineError::Fatal(_) => trace!(error = %err, "compiler aborted"),
                _ => warn!(
                    error = %err,
                    classpath = %ctx.config.engine.classpath,
                    language_level = %ctx.config.engine.language_level,
                    "inconsistent compiler state"
                ),
            }
            Status::Failure
        }
        ErrorClass::Transient => {
            warn!(error = %err, "compiler fault");
            Status::Failure
        }
    }
}
