//! The incrementally updated index record.
//!
//! - [`ParsingOutput`] - The accumulator every worker run folds into
//! - [`UnitResult`] - One finished unit's contribution, applied at a checkpoint
//! - [`FqnIndex`] - Unit → declared type names
//! - [`IndexDelta`] - Added / removed / changed types for the storage layer

mod delta;
mod fqn;
mod output;

pub use delta::IndexDelta;
pub use fqn::FqnIndex;
pub use output::{ParsingOutput, UnitResult};
