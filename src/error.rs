//! Error types for the expdesign library.
//!
//! This module provides error handling using the `thiserror` crate, with
//! variants for allocation failures, block completeness, run-count validation,
//! factor configuration, and the thin configuration/export surfaces.

use thiserror::Error;

/// The main error type for the expdesign library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ============ Allocation Errors ============
    /// The requested sample sizes cannot be met by the unit pool.
    #[error("requested sample size {requested} exceeds available units {available}")]
    Allocation {
        /// Total number of units requested.
        requested: usize,
        /// Number of units in the pool.
        available: usize,
    },

    /// A block does not hold enough units for a complete treatment set.
    #[error(
        "block '{block}' has {available} units but needs {required} \
         ({treatments} treatments x {replications} replications)"
    )]
    IncompleteBlock {
        /// The block identifier.
        block: String,
        /// Units found in the block.
        available: usize,
        /// Units required for a complete block.
        required: usize,
        /// Number of treatments.
        treatments: usize,
        /// Replications per treatment per block.
        replications: usize,
    },

    // ============ Design Shape Errors ============
    /// The run count or factor count is not supported by the design.
    #[error("invalid run count: {message}")]
    InvalidRunCount {
        /// Description of what is invalid.
        message: String,
    },

    /// Factor names, levels or counts are inconsistent.
    #[error("invalid factor configuration: {message}")]
    InvalidFactorConfig {
        /// Description of what is invalid.
        message: String,
    },

    /// A generator expression is malformed.
    #[error("invalid generator expression '{expression}': {reason}")]
    InvalidGenerator {
        /// The expression as written.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    // ============ Table Errors ============
    /// A named column does not exist.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// Table dimensions are inconsistent.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension description.
        expected: String,
        /// Actual dimension description.
        actual: String,
    },

    // ============ Surface Errors ============
    /// An experiment configuration could not be read.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A design table could not be exported.
    #[error("export failed: {message}")]
    Export {
        /// Description of the problem.
        message: String,
    },
}

/// A specialized `Result` type for expdesign operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Create a new `InvalidRunCount` error.
    #[must_use]
    pub fn invalid_run_count(message: impl Into<String>) -> Self {
        Self::InvalidRunCount {
            message: message.into(),
        }
    }

    /// Create a new `InvalidFactorConfig` error.
    #[must_use]
    pub fn invalid_factors(message: impl Into<String>) -> Self {
        Self::InvalidFactorConfig {
            message: message.into(),
        }
    }

    /// Create a new `InvalidGenerator` error.
    #[must_use]
    pub fn invalid_generator(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGenerator {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Export {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Allocation {
            requested: 120,
            available: 100,
        };
        assert!(err.to_string().contains("120"));
        assert!(err.to_string().contains("100"));

        let err = Error::IncompleteBlock {
            block: "north".into(),
            available: 3,
            required: 8,
            treatments: 4,
            replications: 2,
        };
        let text = err.to_string();
        assert!(text.contains("north"));
        assert!(text.contains("needs 8"));
        assert!(text.contains("4 treatments x 2 replications"));

        let err = Error::invalid_generator("DAB", "missing '='");
        assert!(err.to_string().contains("DAB"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_error_equality() {
        let err1 = Error::invalid_run_count("6 is not a power of two");
        let err2 = Error::invalid_run_count("6 is not a power of two");
        let err3 = Error::invalid_factors("6 is not a power of two");

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
