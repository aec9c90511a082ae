//! The iterator contract a worker drains, with optional concurrent prefetch.

use std::collections::VecDeque;
use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{SourceLoader, SourceUnit};
use crate::config::PrefetchMode;

/// Units loaded ahead of the worker in [`PrefetchMode::Concurrent`].
pub const PREFETCH_WINDOW: usize = 32;

/// A unit together with the text the engine will parse.
#[derive(Clone, Debug)]
pub struct PrefetchedUnit {
    pub unit: SourceUnit,
    pub text: Arc<str>,
}

/// Supplies the units of one batch to a worker.
///
/// The worker calls `remove` after each `next` to acknowledge the unit and
/// `close` when it stops, including on early return.
pub trait SourceUnitSupplier {
    /// More units remain and the batch has not been cancelled.
    fn has_next(&mut self) -> bool;

    /// The next unit, or `None` when that unit is no longer present.
    fn next(&mut self) -> Option<PrefetchedUnit>;

    /// Release resources held for the unit returned by the last `next`.
    fn remove(&mut self);

    /// Release everything still prefetched.
    fn close(&mut self);
}

/// The default supplier: loads units through a [`SourceLoader`],
/// sequentially or a window at a time in parallel.
///
/// Dropping the prefetcher closes it.
pub struct SourcePrefetcher {
    pending: VecDeque<SourceUnit>,
    ready: VecDeque<(SourceUnit, Option<Arc<str>>)>,
    current: Option<Arc<str>>,
    loader: Arc<dyn SourceLoader>,
    mode: PrefetchMode,
    cancel: CancellationToken,
    closed: bool,
}

impl SourcePrefetcher {
    pub fn create(
        units: &[SourceUnit],
        loader: Arc<dyn SourceLoader>,
        mode: PrefetchMode,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pending: units.iter().cloned().collect(),
            ready: VecDeque::new(),
            current: None,
            loader,
            mode,
            cancel,
            closed: false,
        }
    }

    /// Units handed out by neither `next` nor still buffered.
    pub fn remaining(&self) -> usize {
        self.pending.len() + self.ready.len()
    }

    fn load(loader: &dyn SourceLoader, unit: &SourceUnit) -> Option<Arc<str>> {
        match loader.load(unit) {
            Ok(text) => {
                if text.is_none() {
                    debug!(unit = ?unit, "source unit disappeared, skipping");
                }
                text
            }
            Err(e) => {
                warn!(unit = ?unit, error = %e, "cannot read source unit");
                None
            }
        }
    }

    fn fill_window(&mut self) {
        let take = self.pending.len().min(PREFETCH_WINDOW);
        let window: Vec<SourceUnit> = self.pending.drain(..take).collect();
        let loader = &*self.loader;
        let loaded: Vec<_> = window
            .into_par_iter()
            .map(|unit| {
                let text = Self::load(loader, &unit);
                (unit, text)
            })
            .collect();
        self.ready.extend(loaded);
    }
}

impl SourceUnitSupplier for SourcePrefetcher {
    fn has_next(&mut self) -> bool {
        !self.closed && !self.cancel.is_cancelled() && self.remaining() > 0
    }

    fn next(&mut self) -> Option<PrefetchedUnit> {
        let (unit, text) = match self.mode {
            PrefetchMode::Sequential => {
                let unit = self.pending.pop_front()?;
                let text = Self::load(&*self.loader, &unit);
                (unit, text)
            }
            PrefetchMode::Concurrent => {
                if self.ready.is_empty() {
                    self.fill_window();
                }
                self.ready.pop_front()?
            }
        };
        let text = text?;
        self.current = Some(Arc::clone(&text));
        Some(PrefetchedUnit { unit, text })
    }

    fn remove(&mut self) {
        self.current = None;
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.ready.clear();
            self.pending.clear();
        }
    }
}

impl Drop for SourcePrefetcher {
    fn drop(&mut self) {
        self.close();
    }
}
