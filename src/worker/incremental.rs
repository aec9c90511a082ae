//! Unit-at-a-time strategy with supertype-first ordering.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info_span, trace};

use super::dependency::DependencyScanner;
use super::generation::{GenerationQueue, PendingArtifact};
use super::parse::{ParsePhase, ParseSession, parse_batch};
use super::{BatchContext, CompileWorker, Outcome, Status, WorkerKind, status_for_error};
use crate::base::UnitId;
use crate::engine::{
    CompilerEngine, CompilerEngineHandle, DeclaredElement, DiagnosticCounter, EngineFactory,
    ParsedUnit, TypeHandle,
};
use crate::error::EngineResult;
use crate::index::{ParsingOutput, UnitResult};
use crate::unit::SourceUnit;

type Tree<F> = <<F as EngineFactory>::Engine as CompilerEngine>::Tree;

/// Compiles a batch one unit at a time.
///
/// Before a unit is analyzed, every same-batch unit declaring one of its
/// transitive supertypes is moved ahead of it in the queue. A unit's
/// dependencies are scanned only on its first visit, so cyclic
/// hierarchies terminate. Each finished unit is committed at once, which
/// makes a low-memory stop resumable.
#[derive(Clone, Copy, Debug, Default)]
pub struct IncrementalEnterWorker;

impl IncrementalEnterWorker {
    pub fn new() -> Self {
        Self
    }
}

impl<F: EngineFactory> CompileWorker<F> for IncrementalEnterWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::IncrementalEnter
    }

    fn compile(
        &self,
        previous: Option<&ParsingOutput>,
        ctx: &BatchContext<'_, F>,
        units: &[SourceUnit],
    ) -> Outcome {
        let span = info_span!("worker", kind = %WorkerKind::IncrementalEnter, units = units.len());
        let _enter = span.enter();

        let mut output = ParsingOutput::starting_from(previous);
        let generation = GenerationQueue::new(Arc::clone(&ctx.artifacts));

        let status = {
            let counter = Arc::new(DiagnosticCounter::new(Arc::clone(&ctx.diagnostics)));
            let handle = CompilerEngineHandle::new(
                ctx.factory,
                &ctx.config.engine,
                counter.clone(),
                ctx.cancel.clone(),
            );
            let run = Run {
                previous,
                ctx,
                units,
                output: &mut output,
                generation: &generation,
                counter,
                session: ParseSession::new(handle),
                pending: FxHashMap::default(),
                entered: FxHashMap::default(),
                done: previous
                    .map(|p| p.finished().iter().copied().collect())
                    .unwrap_or_default(),
                queue: VecDeque::new(),
                module_assigned: false,
            };
            run.execute()
        };

        let report = generation.wait();
        output.record_created(report.created);
        debug!(
            ?status,
            finished = output.finished().len(),
            failed_writes = report.failed,
            "incremental worker done"
        );
        status.into_outcome(output)
    }
}

/// A unit whose symbols are entered but whose bodies are not analyzed yet.
struct Entered {
    unit: SourceUnit,
    elements: Vec<DeclaredElement>,
}

enum Visit {
    Deferred,
    Finished,
    Skipped,
    /// Cancelled or out of memory before the unit was committed.
    Interrupted(Status),
}

struct Run<'r, 'a, F: EngineFactory> {
    previous: Option<&'r ParsingOutput>,
    ctx: &'r BatchContext<'a, F>,
    units: &'r [SourceUnit],
    output: &'r mut ParsingOutput,
    generation: &'r GenerationQueue,
    counter: Arc<DiagnosticCounter>,
    session: ParseSession<'r, F>,
    /// Parsed but never visited. Removal on first visit is what stops
    /// dependency scanning from looping on cyclic hierarchies.
    pending: FxHashMap<UnitId, ParsedUnit<Tree<F>>>,
    entered: FxHashMap<UnitId, Entered>,
    done: FxHashSet<UnitId>,
    queue: VecDeque<UnitId>,
    module_assigned: bool,
}

impl<'r, 'a, F: EngineFactory> Run<'r, 'a, F> {
    fn execute(mut self) -> Status {
        match parse_batch(self.previous, self.ctx, self.units, &mut self.session, self.output) {
            Ok(ParsePhase::Nothing) => return Status::Success,
            Ok(ParsePhase::Parsed) => {}
            Err(status) => return status,
        }

        for parsed in self.session.take_parsed() {
            let id = parsed.unit.id();
            self.queue.push_back(id);
            self.pending.insert(id, parsed);
        }
        if self.queue.is_empty() {
            return Status::Failure;
        }

        while let Some(id) = self.queue.pop_front() {
            if let Some(status) = self.ctx.interrupted() {
                self.session.dispose();
                return status;
            }
            if self.done.contains(&id) {
                continue;
            }
            match self.visit(id) {
                Ok(Visit::Finished) => trace!(unit = %id, "unit finished"),
                Ok(Visit::Deferred | Visit::Skipped) => {}
                Ok(Visit::Interrupted(status)) => {
                    self.session.dispose();
                    return status;
                }
                Err(err) => {
                    self.session.dispose();
                    return status_for_error(err, self.ctx, self.units, self.output);
                }
            }
        }
        Status::Success
    }

    fn visit(&mut self, id: UnitId) -> EngineResult<Visit> {
        let engine = self.session.engine()?;

        if let Some(parsed) = self.pending.remove(&id) {
            let elements = engine.enter(std::slice::from_ref(&parsed))?;
            let types = type_handles(&elements);
            self.entered.insert(
                id,
                Entered {
                    unit: parsed.unit,
                    elements,
                },
            );

            let pending = &self.pending;
            let done = &self.done;
            let deps = DependencyScanner::new(&*engine)
                .scan(id, &types, |u| pending.contains_key(&u) && !done.contains(&u));
            if !deps.is_empty() {
                debug!(unit = %id, deps = deps.len(), "analyzing supertypes first");
                self.queue.push_front(id);
                for dep in deps {
                    self.queue.push_front(dep);
                }
                return Ok(Visit::Deferred);
            }
        }

        if let Some(status) = self.ctx.interrupted() {
            return Ok(Visit::Interrupted(status));
        }
        let Some(Entered { unit, elements }) = self.entered.remove(&id) else {
            return Ok(Visit::Skipped);
        };

        engine.analyze(&elements)?;
        if self.ctx.config.engine.annotation_processing {
            self.output.record_apt_generated(engine.take_apt_generated(id));
        }

        let modules = elements.iter().filter_map(|e| e.module_handle()).collect();
        let result = UnitResult::classify(
            self.previous,
            id,
            type_handles(&elements),
            engine.checksum(&elements),
            self.ctx.supplementary,
        )
        .with_modules(modules)
        .with_errors(self.counter.has_errors(id));

        if let Some(status) = self.ctx.interrupted() {
            return Ok(Visit::Interrupted(status));
        }
        let artifacts = engine.generate(&elements)?;
        let report_created = !unit.is_virtual();
        self.generation.dispatch(
            artifacts
                .into_iter()
                .map(|artifact| PendingArtifact {
                    artifact,
                    report_created,
                })
                .collect(),
        );
        if !self.module_assigned {
            self.output.set_module_name(engine.owning_module(id));
            self.module_assigned = true;
        }

        self.output.commit(result);
        self.counter.publish(id);
        self.done.insert(id);
        Ok(Visit::Finished)
    }
}

fn type_handles(elements: &[DeclaredElement]) -> Vec<TypeHandle> {
    elements.iter().filter_map(DeclaredElement::type_handle).collect()
}
