//! Whole-batch strategy: one enter and one analyze for every unit.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::{debug, info_span};

use super::generation::{GenerationQueue, PendingArtifact};
use super::parse::{ParsePhase, ParseSession, parse_batch};
use super::{BatchContext, CompileWorker, Outcome, Status, WorkerKind, status_for_error};
use crate::base::UnitId;
use crate::engine::{
    CompilerEngine, CompilerEngineHandle, DeclaredElement, DiagnosticCounter, EngineFactory,
    TypeHandle,
};
use crate::error::EngineResult;
use crate::index::{ParsingOutput, UnitResult};
use crate::unit::SourceUnit;

/// Compiles the whole batch in a single engine pass.
///
/// Fastest when the batch is consistent; any analysis fault fails the
/// whole batch so the selector can fall back to
/// [`IncrementalEnterWorker`](super::IncrementalEnterWorker).
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchEnterWorker;

impl BatchEnterWorker {
    pub fn new() -> Self {
        Self
    }
}

impl<F: EngineFactory> CompileWorker<F> for BatchEnterWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::BatchEnter
    }

    fn compile(
        &self,
        previous: Option<&ParsingOutput>,
        ctx: &BatchContext<'_, F>,
        units: &[SourceUnit],
    ) -> Outcome {
        let span = info_span!("worker", kind = %WorkerKind::BatchEnter, units = units.len());
        let _enter = span.enter();

        let mut output = ParsingOutput::starting_from(previous);
        let generation = GenerationQueue::new(Arc::clone(&ctx.artifacts));

        let status = run(previous, ctx, units, &mut output, &generation);

        let report = generation.wait();
        output.record_created(report.created);
        debug!(
            ?status,
            finished = output.finished().len(),
            failed_writes = report.failed,
            "batch worker done"
        );
        status.into_outcome(output)
    }
}

fn run<F: EngineFactory>(
    previous: Option<&ParsingOutput>,
    ctx: &BatchContext<'_, F>,
    units: &[SourceUnit],
    output: &mut ParsingOutput,
    generation: &GenerationQueue,
) -> Status {
    let counter = Arc::new(DiagnosticCounter::new(Arc::clone(&ctx.diagnostics)));
    let handle = CompilerEngineHandle::new(
        ctx.factory,
        &ctx.config.engine,
        counter.clone(),
        ctx.cancel.clone(),
    );
    let mut session = ParseSession::new(handle);

    match parse_batch(previous, ctx, units, &mut session, output) {
        Ok(ParsePhase::Nothing) => return Status::Success,
        Ok(ParsePhase::Parsed) => {}
        Err(status) => return status,
    }

    let parsed = session.take_parsed();
    if parsed.is_empty() {
        return Status::Failure;
    }
    if let Some(status) = ctx.interrupted() {
        session.dispose();
        return status;
    }

    let order: Vec<SourceUnit> = parsed.iter().map(|p| p.unit.clone()).collect();
    let result = (|| -> EngineResult<Option<Status>> {
        let engine = session.engine()?;

        let elements = engine.enter(&parsed)?;
        drop(parsed);
        if let Some(status) = ctx.interrupted() {
            return Ok(Some(status));
        }

        engine.analyze(&elements)?;
        if ctx.config.engine.annotation_processing {
            for unit in &order {
                output.record_apt_generated(engine.take_apt_generated(unit.id()));
            }
        }
        if let Some(status) = ctx.interrupted() {
            return Ok(Some(status));
        }

        let by_unit = group_by_unit(&order, &elements);
        let results: Vec<UnitResult> = by_unit
            .iter()
            .map(|(&unit, declared)| {
                let types: Vec<TypeHandle> =
                    declared.iter().filter_map(|e| e.type_handle()).collect();
                let modules = declared.iter().filter_map(|e| e.module_handle()).collect();
                UnitResult::classify(
                    previous,
                    unit,
                    types,
                    engine.checksum(declared),
                    ctx.supplementary,
                )
                .with_modules(modules)
                .with_errors(counter.has_errors(unit))
            })
            .collect();
        if let Some(status) = ctx.interrupted() {
            return Ok(Some(status));
        }

        let artifacts = engine.generate(&elements)?;
        let virtual_units: FxHashSet<UnitId> = order
            .iter()
            .filter(|u| u.is_virtual())
            .map(SourceUnit::id)
            .collect();
        generation.dispatch(
            artifacts
                .into_iter()
                .map(|artifact| PendingArtifact {
                    report_created: !virtual_units.contains(&artifact.unit),
                    artifact,
                })
                .collect(),
        );
        if let Some(first) = order.first() {
            output.set_module_name(engine.owning_module(first.id()));
        }

        for result in results {
            let unit = result.unit;
            output.commit(result);
            counter.publish(unit);
        }
        Ok(None)
    })();

    match result {
        Ok(None) => Status::Success,
        Ok(Some(status)) => {
            session.dispose();
            status
        }
        Err(err) => {
            session.dispose();
            status_for_error(err, ctx, &order, output)
        }
    }
}

/// Declared elements keyed by unit, in batch order. Units that declared
/// nothing still get an entry.
fn group_by_unit(
    order: &[SourceUnit],
    elements: &[DeclaredElement],
) -> IndexMap<UnitId, Vec<DeclaredElement>> {
    let mut by_unit: IndexMap<UnitId, Vec<DeclaredElement>> =
        order.iter().map(|u| (u.id(), Vec::new())).collect();
    for element in elements {
        if let Some(declared) = by_unit.get_mut(&element.unit) {
            declared.push(element.clone());
        }
    }
    by_unit
}
