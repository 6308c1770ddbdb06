//! Error types for the strata library.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use thiserror::Error;

/// Main error type for strata operations.
///
/// All errors are raised synchronously at the point of detection. A failing
/// compile, insert or nesting pass aborts immediately and leaves any
/// formation cache empty, so a corrected retry starts clean.
#[derive(Error, Debug)]
pub enum StrataError {
    /// A generation parameter was malformed: not a mapping, or it declared
    /// a key outside the allowed set.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A name could not be resolved: an unregistered dynamic or builtin
    /// shortcut on insert, or an unresolved nested-template reference.
    /// The message enumerates the currently valid alternatives.
    #[error("{0}")]
    Lookup(String),

    /// A fragment source file is missing.
    #[error("{0}")]
    NotFound(String),
}

/// Result type alias for strata operations.
pub type Result<T> = std::result::Result<T, StrataError>;
