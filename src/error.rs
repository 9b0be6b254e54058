//! Error types for the adapter layers.
//!
//! The graph pipeline itself is total; these cover loading, exporting and
//! configuration failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceflowError {
    /// No record in the source carries this correlation id
    #[error("No trace records found for correlation id '{0}'")]
    UnknownCorrelation(String),

    #[error("Unknown output format '{0}'. Valid formats: dot, json")]
    UnknownFormat(String),

    #[error("Unknown inference strategy '{0}'. Valid strategies: exhaustive, prefix-indexed")]
    UnknownStrategy(String),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Missing parameter '{0}'")]
    MissingParam(&'static str),
}
