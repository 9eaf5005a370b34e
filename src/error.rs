//! Error types for every matrix operation.
//!
//! All construction and arithmetic failures are reported through the single
//! [`Error`] enum. Nothing is retried internally; the caller gets the error
//! back synchronously and no half-built matrix is ever returned.

use thiserror::Error;

/// The main error type for matrix operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Operands of an element-wise merge or comparison are not the same shape.
    #[error("matrices are not the same shape: {lhs:?} and {rhs:?}")]
    ShapeMismatch {
        lhs: (usize, usize),
        rhs: (usize, usize),
    },

    /// Non-positive, overflowing or count-mismatched dimensions.
    #[error("{message}")]
    Dimension {
        message: String,
    },

    /// A value had the wrong type for where it was used.
    #[error("{label} must be type '{expected}', found type '{found}'")]
    TypeMismatch {
        label: String,
        expected: &'static str,
        found: String,
    },

    /// An operator was applied to a combination of operand kinds it does not support.
    #[error("unsupported operand type(s) for '{op}': '{lhs}' and '{rhs}'")]
    UnsupportedOperands {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    /// Scalar or element-wise division by zero.
    #[error("{message}")]
    DivisionByZero {
        /// Which divisor was zero.
        message: &'static str,
    },

    /// An argument had an acceptable type but an unusable value.
    #[error("{message}")]
    InvalidValue {
        message: String,
    },

    /// The element buffer could not be allocated.
    #[error("failed to allocate a buffer of {elements} element(s)")]
    Allocation {
        /// Number of `f64` elements requested.
        elements: usize,
    },

    /// A user-supplied mapping function failed.
    #[error("mapping '{label}' raised exception when called with '{element}': {reason}")]
    Callback {
        /// Identifying label of the mapping.
        label: String,
        /// The element it was called with, formatted to 4 decimal places.
        element: String,
        /// The callback's own error message.
        reason: String,
    },

    /// The demo configuration could not be read.
    #[error("config error: {message}")]
    Config {
        message: String,
    },
}

/// A specialized Result type for matrix operations.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Creates a new shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(lhs: (usize, usize), rhs: (usize, usize)) -> Self {
        Self::ShapeMismatch { lhs, rhs }
    }

    /// Creates a new dimension error.
    #[must_use]
    pub fn dimension(message: impl Into<String>) -> Self {
        Self::Dimension {
            message: message.into(),
        }
    }

    /// Creates a new type mismatch error.
    #[must_use]
    pub fn type_mismatch(
        label: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            label: label.into(),
            expected,
            found: found.into(),
        }
    }

    /// Creates a new unsupported operands error.
    #[must_use]
    pub fn unsupported(op: &'static str, lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Self::UnsupportedOperands {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// Creates a new invalid value error.
    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}
