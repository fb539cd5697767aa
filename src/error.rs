//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use thiserror::Error;

/// Main error type for phasing operations
#[derive(Error, Debug)]
pub enum PhaseError {
    /// A variant column admits no inheritance configuration with finite cost
    #[error("Mendelian conflict at column {column}: no transmission configuration explains the reads")]
    MendelianConflict { column: usize },

    /// Invalid construction inputs (length mismatches, unsupported ploidy, unknown samples)
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Cost arithmetic left the saturating domain; indicates a bug
    #[error("Cost overflow: {message}")]
    Overflow { message: String },
}

/// Type alias for Results using PhaseError
pub type Result<T> = std::result::Result<T, PhaseError>;

impl PhaseError {
    /// Create a Mendelian conflict error for a column
    pub fn mendelian_conflict(column: usize) -> Self {
        Self::MendelianConflict { column }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an overflow error
    pub fn overflow(message: impl Into<String>) -> Self {
        Self::Overflow {
            message: message.into(),
        }
    }
}
