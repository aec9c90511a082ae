//! The parse phase shared by both workers.

use tracing::{debug, warn};

use super::{BatchContext, Status};
use crate::engine::{CompilerEngine, CompilerEngineHandle, EngineFactory, ParsedUnit};
use crate::error::{EngineResult, ErrorClass};
use crate::index::ParsingOutput;
use crate::unit::{PrefetchedUnit, SourcePrefetcher, SourceUnit, SourceUnitSupplier};

type Tree<F> = <<F as EngineFactory>::Engine as CompilerEngine>::Tree;

/// Parses units into one engine and survives engine faults.
///
/// Sources of successfully parsed units are retained. When the engine
/// faults on a unit it is discarded, a fresh engine re-parses the retained
/// sources, and the faulty unit is dropped from the batch.
pub(crate) struct ParseSession<'a, F: EngineFactory> {
    handle: CompilerEngineHandle<'a, F>,
    sources: Vec<PrefetchedUnit>,
    parsed: Vec<ParsedUnit<Tree<F>>>,
}

impl<'a, F: EngineFactory> ParseSession<'a, F> {
    pub(crate) fn new(handle: CompilerEngineHandle<'a, F>) -> Self {
        Self {
            handle,
            sources: Vec::new(),
            parsed: Vec::new(),
        }
    }

    /// Parse one unit. Returns `false` if the engine faulted on it and it
    /// was dropped.
    pub(crate) fn parse(&mut self, source: PrefetchedUnit) -> EngineResult<bool> {
        let engine = self.handle.get()?;
        match engine.parse(&source.unit, &source.text) {
            Ok(parsed) => {
                self.parsed.push(parsed);
                self.sources.push(source);
                Ok(true)
            }
            Err(err) if err.class() == ErrorClass::Transient => {
                warn!(unit = ?source.unit, error = %err, "parser fault, dropping unit");
                self.replay()?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Re-parse every retained source into a fresh engine.
    fn replay(&mut self) -> EngineResult<()> {
        loop {
            self.handle.discard();
            self.parsed.clear();
            let engine = self.handle.get()?;

            let mut faulty = None;
            for (i, source) in self.sources.iter().enumerate() {
                match engine.parse(&source.unit, &source.text) {
                    Ok(parsed) => self.parsed.push(parsed),
                    Err(err) if err.class() == ErrorClass::Transient => {
                        warn!(unit = ?source.unit, error = %err, "parser fault on replay, dropping unit");
                        faulty = Some(i);
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }

            match faulty {
                Some(i) => {
                    self.sources.remove(i);
                }
                None => {
                    debug!(units = self.parsed.len(), "replayed parse into fresh engine");
                    return Ok(());
                }
            }
        }
    }

    pub(crate) fn parsed(&self) -> &[ParsedUnit<Tree<F>>] {
        &self.parsed
    }

    pub(crate) fn take_parsed(&mut self) -> Vec<ParsedUnit<Tree<F>>> {
        self.sources.clear();
        std::mem::take(&mut self.parsed)
    }

    pub(crate) fn engine(&mut self) -> EngineResult<&mut F::Engine> {
        self.handle.get()
    }

    pub(crate) fn dispose(&mut self) {
        self.parsed.clear();
        self.sources.clear();
        self.handle.dispose();
    }
}

/// What the parse phase left behind.
pub(crate) enum ParsePhase {
    /// No unit of the batch was present.
    Nothing,
    Parsed,
}

/// Drain the batch's supplier into `session`, recording each parsed unit's
/// declared names as soon as it parses.
///
/// Units `previous` already lists as finished are not handed to the
/// supplier, so a re-submitted batch only compiles what is left.
pub(crate) fn parse_batch<F: EngineFactory>(
    previous: Option<&ParsingOutput>,
    ctx: &BatchContext<'_, F>,
    units: &[SourceUnit],
    session: &mut ParseSession<'_, F>,
    output: &mut ParsingOutput,
) -> Result<ParsePhase, Status> {
    let todo: Vec<SourceUnit> = units
        .iter()
        .filter(|u| !previous.is_some_and(|p| p.is_finished(u.id())))
        .cloned()
        .collect();
    if todo.len() < units.len() {
        debug!(skipped = units.len() - todo.len(), "units already finished");
    }

    let mut supplier = SourcePrefetcher::create(
        &todo,
        ctx.loader.clone(),
        ctx.config.prefetch,
        ctx.cancel.clone(),
    );
    let mut present = false;

    while supplier.has_next() {
        let Some(source) = supplier.next() else {
            supplier.remove();
            continue;
        };
        present = true;

        if ctx.memory.is_low_memory() {
            supplier.close();
            session.dispose();
            return Err(Status::LowMemory);
        }

        let unit = source.unit.id();
        match session.parse(source) {
            Ok(true) => {
                if let Some(parsed) = session.parsed().last() {
                    output.record_fqns(unit, parsed.declared.iter().cloned());
                }
            }
            Ok(false) => {}
            Err(err) => {
                supplier.close();
                session.dispose();
                return Err(super::status_for_error(err, ctx, units, output));
            }
        }
        supplier.remove();
    }
    supplier.close();

    if ctx.cancel.is_cancelled() {
        session.dispose();
        return Err(Status::Cancelled);
    }
    Ok(if present {
        ParsePhase::Parsed
    } else {
        ParsePhase::Nothing
    })
}
