//! Error types for stridr

use thiserror::Error;

/// Result type alias using stridr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stridr operations
///
/// All shape and format checks are performed synchronously, before any work
/// is enqueued on the device. Kernel compilation failures are detected at the
/// device interaction point and reported as [`Error::Compile`].
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Host buffer does not match the expected element type or size
    #[error("Format error: {reason}")]
    Format {
        /// Why the host buffer was rejected
        reason: String,
    },

    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Shapes cannot be broadcast together
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}")]
    Broadcast {
        /// Left-hand side shape
        lhs: Vec<usize>,
        /// Right-hand side shape
        rhs: Vec<usize>,
    },

    /// Operation requires a contiguous view
    #[error("Operation requires contiguous array")]
    NotContiguous,

    /// Unrecognized operation name or graph op code
    #[error("Unsupported operation '{op}'")]
    UnsupportedOp {
        /// The offending operation name/code
        op: String,
    },

    /// Device kernel compilation failed
    #[error("Kernel compilation failed for '{op}': {message}")]
    Compile {
        /// The operation whose kernel failed to compile
        op: &'static str,
        /// The underlying compiler diagnostic
        message: String,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// No suitable GPU adapter found
    #[error("No suitable WebGPU adapter found")]
    NoAdapter,

    /// Device creation or device-level operation failed
    #[error("WebGPU device error: {0}")]
    Device(String),

    /// Backend-specific error (buffer mapping, readback)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create a format error
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::Broadcast {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported_op(op: impl Into<String>) -> Self {
        Self::UnsupportedOp { op: op.into() }
    }

    /// Whether this error is a shape-class failure
    ///
    /// Broadcast failures are shape errors from the caller's point of view;
    /// they carry the operand shapes instead of an expected/got pair.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Error::ShapeMismatch { .. } | Error::Broadcast { .. } | Error::NotContiguous
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_classification() {
        assert!(Error::shape_mismatch(&[2, 3], &[3, 2]).is_shape_error());
        assert!(Error::broadcast(&[3], &[4]).is_shape_error());
        assert!(!Error::unsupported_op("pow").is_shape_error());
        assert!(!Error::format("not float32").is_shape_error());
    }
}
