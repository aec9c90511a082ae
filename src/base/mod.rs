//! Foundation types for the indexing pipeline.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`UnitId`] - Interned source unit identifiers
//! - [`TextSize`] - Source offsets
//! - [`LineCol`], [`Position`] - Where a diagnostic points
//!
//! This module has NO dependencies on other srcindex modules.

mod span;
mod unit_id;

pub use span::{LineCol, Position, TextSize};
pub use unit_id::UnitId;

// Re-export text-size types for convenience
pub use text_size;
