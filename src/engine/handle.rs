//! Exclusive, re-creatable ownership of one engine instance.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{DiagnosticCounter, DiagnosticListener, EngineFactory};
use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Owns at most one engine for the duration of a worker run.
///
/// The engine is created on first use. [`discard`](Self::discard) drops it
/// after a fault so the next [`get`](Self::get) starts from clean symbol
/// tables; [`dispose`](Self::dispose) does the same to free memory. Both
/// drop the diagnostics the engine reported for units not yet committed.
pub struct CompilerEngineHandle<'a, F: EngineFactory> {
    factory: &'a F,
    config: &'a EngineConfig,
    diagnostics: Arc<DiagnosticCounter>,
    cancel: CancellationToken,
    engine: Option<F::Engine>,
    created: u32,
}

impl<'a, F: EngineFactory> CompilerEngineHandle<'a, F> {
    pub fn new(
        factory: &'a F,
        config: &'a EngineConfig,
        diagnostics: Arc<DiagnosticCounter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            factory,
            config,
            diagnostics,
            cancel,
            engine: None,
            created: 0,
        }
    }

    /// The live engine, creating one if needed.
    pub fn get(&mut self) -> EngineResult<&mut F::Engine> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                let listener: Arc<dyn DiagnosticListener> = self.diagnostics.clone();
                let engine = self
                    .factory
                    .create(self.config, listener, self.cancel.clone())?;
                self.created += 1;
                debug!(instance = self.created, "created compiler engine");
                engine
            }
        };
        Ok(self.engine.insert(engine))
    }

    /// Drop the engine because its state can no longer be trusted.
    pub fn discard(&mut self) {
        self.diagnostics.clear();
        if self.engine.take().is_some() {
            debug!("discarded compiler engine");
        }
    }

    /// Drop the engine to release its trees and symbol tables.
    pub fn dispose(&mut self) {
        self.diagnostics.clear();
        if self.engine.take().is_some() {
            debug!("disposed compiler engine");
        }
    }
}
