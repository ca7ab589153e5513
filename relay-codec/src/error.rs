//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding a record.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("string of {len} bytes exceeds the 32-bit length prefix")]
    StringTooLong { len: usize },

    #[error("sequence of {len} elements exceeds the 32-bit count prefix")]
    SequenceTooLong { len: usize },
}

/// Error raised while decoding a record, carrying the byte position the
/// decoder had reached.
#[derive(Debug, Error)]
#[error("failed to unpack at position {position}: {message}")]
pub struct UnpackError {
    pub position: usize,
    pub message: String,
}

impl UnpackError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    /// Truncated-input error for a value of the named kind.
    pub fn eof(position: usize, what: &str) -> Self {
        Self::new(position, format!("expected {what}, got end of input"))
    }
}

/// Errors raised while parsing the textual form of an identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("identifier must be 32 characters, got {0}")]
    WrongLength(usize),

    #[error("invalid character {0:?} in identifier")]
    InvalidCharacter(char),
}
