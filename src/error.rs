//! Error types shared by the engine contract and configuration.

use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failures reported by a compiler engine.
///
/// Workers never let these escape; each variant maps onto one recovery
/// path (see [`EngineError::class`]).
#[derive(Error, Debug)]
pub enum EngineError {
    /// Symbol tables from incompatible sources were coupled together.
    #[error("inconsistent compiler state: {0}")]
    Coupling(String),

    /// The compilation platform (boot classpath, system modules) is absent.
    #[error("compilation platform is missing: {0}")]
    MissingPlatform(String),

    /// The engine aborted on a broken internal invariant.
    #[error("fatal compiler error: {0}")]
    Fatal(String),

    /// The engine observed the cancellation token.
    #[error("compilation cancelled")]
    Cancelled,

    /// The engine ran out of memory while holding trees.
    #[error("out of memory")]
    OutOfMemory,

    /// Unexpected engine fault, usually tied to one unit.
    #[error("compiler fault: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a worker reacts to an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Drop the engine, recreate it and keep going.
    Transient,
    /// Abort the batch as `Failure`.
    Structural,
    /// Abort the batch as `Failure` and mark its units broken.
    BrokenPlatform,
    /// Stop early and keep what was committed.
    LowMemory,
    Cancelled,
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Coupling(_) | EngineError::Fatal(_) => ErrorClass::Structural,
            EngineError::MissingPlatform(_) => ErrorClass::BrokenPlatform,
            EngineError::Cancelled => ErrorClass::Cancelled,
            EngineError::OutOfMemory => ErrorClass::LowMemory,
            EngineError::Internal(_) | EngineError::Io(_) => ErrorClass::Transient,
        }
    }
}

/// Invalid configuration overrides.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
