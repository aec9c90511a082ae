//! Artifact writes running alongside the worker.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::artifact::ArtifactStore;
use crate::engine::GeneratedArtifact;

/// An artifact waiting to be written.
pub(crate) struct PendingArtifact {
    pub(crate) artifact: GeneratedArtifact,
    /// Virtual units' outputs are written but not reported as created.
    pub(crate) report_created: bool,
}

#[derive(Default)]
struct State {
    outstanding: usize,
    created: Vec<PathBuf>,
    failed: usize,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    done: Condvar,
}

/// Decrements the outstanding count even if a write panics.
struct Completion(Arc<Shared>);

impl Drop for Completion {
    fn drop(&mut self) {
        let mut state = self.0.state.lock();
        state.outstanding -= 1;
        self.0.done.notify_all();
    }
}

/// What the writes of one worker run amounted to.
#[derive(Debug, Default)]
pub(crate) struct GenerationReport {
    pub(crate) created: Vec<PathBuf>,
    pub(crate) failed: usize,
}

/// Dispatches artifact writes onto the rayon pool and waits for them.
pub(crate) struct GenerationQueue {
    store: Arc<dyn ArtifactStore>,
    shared: Arc<Shared>,
}

impl GenerationQueue {
    pub(crate) fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Write `batch` on another thread. A failed write is logged and does
    /// not affect the other artifacts.
    pub(crate) fn dispatch(&self, batch: Vec<PendingArtifact>) {
        if batch.is_empty() {
            return;
        }
        self.shared.state.lock().outstanding += 1;

        let store = Arc::clone(&self.store);
        let completion = Completion(Arc::clone(&self.shared));
        rayon::spawn(move || {
            let mut created = Vec::new();
            let mut failed = 0;
            for pending in batch {
                match store.write(&pending.artifact) {
                    Ok(Some(path)) if pending.report_created => created.push(path),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            unit = %pending.artifact.unit,
                            path = %pending.artifact.relative_path.display(),
                            error = %e,
                            "cannot write generated artifact"
                        );
                        failed += 1;
                    }
                }
            }
            let mut state = completion.0.state.lock();
            state.created.extend(created);
            state.failed += failed;
        });
    }

    /// Block until every dispatched write has finished.
    pub(crate) fn wait(&self) -> GenerationReport {
        let mut state = self.shared.state.lock();
        while state.outstanding > 0 {
            self.shared.done.wait(&mut state);
        }
        GenerationReport {
            created: std::mem::take(&mut state.created),
            failed: std::mem::take(&mut state.failed),
        }
    }
}
