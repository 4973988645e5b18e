//! Error types for name and reference parsing.

use thiserror::Error;

/// Errors that can occur when parsing or validating names and references.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    /// The input exceeds the maximum length.
    #[error("{kind} too long: {len} bytes (max {max})")]
    TooLong {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    /// The input contains a character that is not allowed.
    #[error("{kind} contains invalid character {ch:?}")]
    InvalidCharacter { kind: &'static str, ch: char },

    /// The tier label is not one of the known tiers.
    #[error("invalid tier: '{0}'")]
    InvalidTier(String),

    /// The reference format is invalid.
    #[error("invalid object reference: {message}")]
    InvalidFormat { message: String },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty { .. })
    }
}
