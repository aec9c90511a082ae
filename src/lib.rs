//! # srcindex-base
//!
//! Incremental compilation of source batches into index state.
//!
//! A host hands the pipeline a batch of source units and the index state
//! produced by earlier batches. The pipeline drives an external compiler
//! engine through parse, enter, analyze and generate, and returns the
//! merged state: declared type names per unit, added, modified and removed
//! types, created output files, and which units finished.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! pipeline → Rounds of annotation-processor output, BatchReport
//!   ↓
//! worker   → WorkerSelector, BatchEnterWorker, IncrementalEnterWorker
//!   ↓
//! index    → ParsingOutput accumulator, FQN index, IndexDelta
//!   ↓
//! engine   → CompilerEngine contract, engine handle, diagnostics
//!   ↓
//! unit     → SourceUnit, UnitSet, loaders, prefetching supplier
//!   ↓
//! base     → Primitives (UnitId, positions)
//! ```
//!
//! `config`, `error`, `memory` and `artifact` sit beside the stack and are
//! used by every layer above `base`.

// ============================================================================
// FOUNDATION
// ============================================================================

/// Foundation types: UnitId, positions
pub mod base;

pub mod config;
pub mod error;
pub mod memory;

// ============================================================================
// PIPELINE
// ============================================================================

pub mod artifact;
pub mod engine;
pub mod index;
pub mod pipeline;
pub mod unit;
pub mod worker;

pub use base::{LineCol, Position, TextSize, UnitId};
pub use config::{EngineConfig, PipelineConfig, PrefetchMode};
pub use error::{EngineError, EngineResult};
pub use index::{IndexDelta, ParsingOutput};
pub use pipeline::{BatchReport, BatchStatus, IndexOptions, IndexingPipeline};
pub use worker::{BatchContext, CompileWorker, Outcome, WorkerSelector};
