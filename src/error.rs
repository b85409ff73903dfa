//! Fatal conversion errors.
//!
//! Only invariant violations end up here. Everything heuristic degrades to a
//! placeholder plus a [`Diagnostic`](crate::diagnostics::Diagnostic).

use crate::config::SettingsError;
use crate::names::ObjectKind;

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors that abort a conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Embedded dimension traversal from '{start}' exceeded depth {max_depth} (path: {})", .path.join(" -> "))]
    RecursionLimit {
        start: String,
        max_depth: usize,
        path: Vec<String>,
    },

    #[error("Duplicate {kind} identifier inserted into the result: {name}")]
    DuplicateIdentifier { kind: ObjectKind, name: String },

    #[error("{kind} '{name}' referenced before it was created")]
    MissingObject { kind: ObjectKind, name: String },

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
}
