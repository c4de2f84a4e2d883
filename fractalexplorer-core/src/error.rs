//! Core error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Failed to parse {input:?}: {reason}")]
    Parse { input: String, reason: String },

    #[error("Invalid precision: {0} bits")]
    InvalidPrecision(usize),

    #[error("Non-finite value for {0}")]
    NonFinite(&'static str),
}
