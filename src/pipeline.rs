//! The indexing entry point: worker selection plus annotation-processing
//! rounds.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::artifact::{ArtifactStore, MemoryArtifactStore};
use crate::base::UnitId;
use crate::config::PipelineConfig;
use crate::engine::{DiagnosticListener, EngineFactory, NullDiagnostics};
use crate::index::{IndexDelta, ParsingOutput};
use crate::memory::{LowMemoryProbe, NeverLowMemory};
use crate::unit::{FsSourceLoader, SourceLoader, SourceUnit, UnitSet};
use crate::worker::{BatchContext, Outcome, WorkerSelector};

/// How a batch ended from the caller's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every round compiled.
    Complete,
    /// No worker could compile the last round; its units are broken.
    Incomplete,
    /// Stopped to free memory. Resubmit the units not yet finished.
    LowMemory,
    Cancelled,
}

/// The result of [`IndexingPipeline::index`].
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub status: BatchStatus,
    pub output: ParsingOutput,
    pub delta: IndexDelta,
    pub broken: FxHashSet<UnitId>,
    /// The index must be refreshed again later.
    pub dirty: bool,
}

impl BatchReport {
    fn new(status: BatchStatus, output: ParsingOutput) -> Self {
        Self {
            status,
            delta: IndexDelta::compute(&output),
            broken: output.broken().clone(),
            dirty: status != BatchStatus::Complete,
            output,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == BatchStatus::Complete
    }
}

/// Per-call options for [`IndexingPipeline::index_with`].
#[derive(Clone, Debug, Default)]
pub struct IndexOptions {
    pub cancel: CancellationToken,
    /// The batch holds dependents of changed files rather than the changed
    /// files themselves.
    pub supplementary: bool,
}

/// Compiles batches of source units into index state.
pub struct IndexingPipeline<F: EngineFactory> {
    factory: F,
    config: PipelineConfig,
    units: Arc<UnitSet>,
    loader: Arc<dyn SourceLoader>,
    artifacts: Arc<dyn ArtifactStore>,
    diagnostics: Arc<dyn DiagnosticListener>,
    memory: Arc<dyn LowMemoryProbe>,
}

impl<F: EngineFactory> IndexingPipeline<F> {
    pub fn new(factory: F, config: PipelineConfig) -> Self {
        Self {
            factory,
            config,
            units: Arc::new(UnitSet::new()),
            loader: Arc::new(FsSourceLoader),
            artifacts: Arc::new(MemoryArtifactStore::new()),
            diagnostics: Arc::new(NullDiagnostics),
            memory: Arc::new(NeverLowMemory),
        }
    }

    pub fn with_units(mut self, units: Arc<UnitSet>) -> Self {
        self.units = units;
        self
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

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Identities of every unit the pipeline has seen, including
    /// annotation-processor output.
    pub fn units(&self) -> &Arc<UnitSet> {
        &self.units
    }

    pub fn index(&self, units: &[SourceUnit], previous: Option<&ParsingOutput>) -> BatchReport {
        self.index_with(units, previous, IndexOptions::default())
    }

    /// Compile `units` on top of `previous`, then compile whatever sources
    /// annotation processors generated, up to `max_rounds` rounds.
    pub fn index_with(
        &self,
        units: &[SourceUnit],
        previous: Option<&ParsingOutput>,
        options: IndexOptions,
    ) -> BatchReport {
        let batch = Uuid::new_v4();
        let span = info_span!("index", %batch, units = units.len());
        let _enter = span.enter();

        if units.is_empty() && previous.is_none() {
            return BatchReport::new(BatchStatus::Complete, ParsingOutput::new());
        }

        let selector = WorkerSelector::new(&self.config);
        let ctx = BatchContext::new(&self.factory, &self.config)
            .with_loader(Arc::clone(&self.loader))
            .with_artifacts(Arc::clone(&self.artifacts))
            .with_diagnostics(Arc::clone(&self.diagnostics))
            .with_memory(Arc::clone(&self.memory))
            .with_cancel(options.cancel)
            .with_supplementary(options.supplementary);

        let mut round_units = units.to_vec();
        let mut carried: Option<ParsingOutput> = None;
        let mut round = 0;

        let (status, output) = loop {
            round += 1;
            let input = carried.as_ref().or(previous);

            let (status, mut output) = match selector.compile(input, &ctx, &round_units) {
                Outcome::Cancelled(out) => break (BatchStatus::Cancelled, out),
                Outcome::LowMemory(out) => {
                    warn!(
                        units = round_units.len(),
                        finished = out.finished().len(),
                        "not enough memory to compile the batch, stopping early"
                    );
                    break (BatchStatus::LowMemory, out);
                }
                Outcome::Success(out) => (BatchStatus::Complete, out),
                Outcome::Failure(out) => (BatchStatus::Incomplete, out),
            };

            if output.apt_generated().is_empty() || round >= self.config.max_rounds {
                break (status, output);
            }

            let generated = output.take_apt_generated();
            debug!(round, files = generated.len(), "compiling annotation processor output");
            round_units = generated
                .iter()
                .map(|path| self.units.unit(path).with_apt_generated(true))
                .collect();
            carried = Some(output);
        };

        debug!(?status, rounds = round, "batch done");
        BatchReport::new(status, output)
    }
}
