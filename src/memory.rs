//! Host-signalled memory pressure.

use std::sync::atomic::{AtomicBool, Ordering};

/// Tells a worker that it should shed compiler state.
///
/// Polled before each unit and before every batch phase.
pub trait LowMemoryProbe: Send + Sync {
    fn is_low_memory(&self) -> bool;
}

/// Never reports memory pressure.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverLowMemory;

impl LowMemoryProbe for NeverLowMemory {
    fn is_low_memory(&self) -> bool {
        false
    }
}

/// A flag the host raises when the heap runs short.
#[derive(Debug, Default)]
pub struct LowMemoryFlag {
    raised: AtomicBool,
}

impl LowMemoryFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }
}

impl LowMemoryProbe for LowMemoryFlag {
    fn is_low_memory(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
