//! Choosing and chaining compile workers.

use tracing::{debug, info_span, warn};

use super::{
    BatchContext, BatchEnterWorker, CompileWorker, IncrementalEnterWorker, Outcome, WorkerKind,
};
use crate::config::PipelineConfig;
use crate::engine::EngineFactory;
use crate::index::ParsingOutput;
use crate::unit::SourceUnit;

/// Orders the workers for a batch and falls back on failure.
///
/// Small batches try [`BatchEnterWorker`] first; batches at or above the
/// threshold go straight to [`IncrementalEnterWorker`], whose memory use
/// does not grow with the batch. Every attempt starts from the same
/// `previous` accumulator.
#[derive(Clone, Copy, Debug)]
pub struct WorkerSelector {
    threshold: usize,
    disable_incremental: bool,
}

impl WorkerSelector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            threshold: config.incremental_threshold,
            disable_incremental: config.disable_incremental,
        }
    }

    /// Workers to try for a batch of `batch_len` units, in order.
    pub fn order(&self, batch_len: usize) -> Vec<WorkerKind> {
        if self.disable_incremental {
            vec![WorkerKind::BatchEnter]
        } else if batch_len < self.threshold {
            vec![WorkerKind::BatchEnter, WorkerKind::IncrementalEnter]
        } else {
            vec![WorkerKind::IncrementalEnter, WorkerKind::BatchEnter]
        }
    }

    /// The first worker tried for a batch of `batch_len` units.
    pub fn select(&self, batch_len: usize) -> WorkerKind {
        self.order(batch_len)[0]
    }

    /// Compile `units`, falling back to the next worker on failure.
    ///
    /// A failed worker's partial output is discarded. If every worker
    /// fails, the result is a failure carrying `previous` with every unit
    /// of the batch marked broken.
    pub fn compile<F: EngineFactory>(
        &self,
        previous: Option<&ParsingOutput>,
        ctx: &BatchContext<'_, F>,
        units: &[SourceUnit],
    ) -> Outcome {
        for kind in self.order(units.len()) {
            let span = info_span!("compile", worker = %kind, units = units.len());
            let _enter = span.enter();

            let outcome = match kind {
                WorkerKind::BatchEnter => BatchEnterWorker.compile(previous, ctx, units),
                WorkerKind::IncrementalEnter => IncrementalEnterWorker.compile(previous, ctx, units),
            };
            match outcome {
                Outcome::Failure(_) => debug!(worker = %kind, "worker failed, trying next"),
                other => return other,
            }
        }

        warn!(units = units.len(), "no worker could compile the batch");
        let mut output = ParsingOutput::starting_from(previous);
        output.mark_broken(units.iter().map(SourceUnit::id));
        Outcome::Failure(output)
    }
}
