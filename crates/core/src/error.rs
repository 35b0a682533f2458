//! Identifier error model.

use thiserror::Error;

/// Result type for identifier construction and parsing.
pub type IdResult<T> = Result<T, IdError>;

/// Failure to build or parse an identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier string was empty or whitespace only.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The identifier contained characters that are not allowed.
    #[error("{kind} contains invalid character {found:?}")]
    InvalidCharacter { kind: &'static str, found: char },

    /// A UUID-backed identifier failed to parse.
    #[error("invalid {kind}: {message}")]
    Malformed { kind: &'static str, message: String },
}
