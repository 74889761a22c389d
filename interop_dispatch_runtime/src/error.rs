//! Runtime error types for host invocations
//!
//! This module provides the error type raised while converting arguments
//! or running a host member on behalf of a script.

use thiserror::Error;

/// Runtime error type
///
/// Represents errors that can occur while a host member runs: argument
/// conversion failures, bounds violations and errors reported by the host
/// code itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Type mismatch error
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Index out of bounds error
    #[error("BoundsError: attempt to access index {index} of dimension with length {length}")]
    BoundsError {
        /// Attempted index
        index: i64,
        /// Dimension length
        length: usize,
    },

    /// Invalid argument error
    #[error("ArgumentError: {0}")]
    ArgumentError(String),

    /// Inexact error (e.g., converting 1.5 to an integer)
    #[error("InexactError: {0}")]
    InexactError(String),

    /// Overflow error
    #[error("OverflowError: {0}")]
    OverflowError(String),

    /// Error reported by host code
    #[error("HostError: {0}")]
    HostError(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

impl RuntimeError {
    /// Create a type error
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::TypeError(msg.into())
    }

    /// Create a bounds error
    pub fn bounds_error(index: i64, length: usize) -> Self {
        RuntimeError::BoundsError { index, length }
    }

    /// Create an argument error
    pub fn argument_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::ArgumentError(msg.into())
    }

    /// Create an inexact error
    pub fn inexact_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::InexactError(msg.into())
    }

    /// Create an overflow error
    pub fn overflow_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::OverflowError(msg.into())
    }

    /// Create a host error
    pub fn host_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::HostError(msg.into())
    }

    /// Create a custom error
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        RuntimeError::Custom(msg.into())
    }
}

/// Result type alias for host invocations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
