//! Error types shared by tensors, the einsum evaluator and the backends.

use thiserror::Error;

/// Boxed error carried as the cause of a failed unit of work.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the core can report.
///
/// Validation variants (`SpecSyntax`, `ShapeMismatch`, `DimensionMismatch`,
/// `UnboundOutputSymbol`) are raised before any numeric work starts. The
/// backend variants distinguish an environment limitation
/// (`BackendUnavailable`) from a runtime fault (`OperationFailed`).
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed einsum string.
    #[error("invalid einsum specification {spec:?}: {reason}")]
    SpecSyntax { spec: String, reason: String },

    /// Data length, operand count, rank or operand shapes disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A label bound to two different extents.
    #[error(
        "label '{label}' has extent {expected} but operand {operand} axis {axis} has extent {found}"
    )]
    DimensionMismatch {
        label: char,
        expected: usize,
        found: usize,
        operand: usize,
        axis: usize,
    },

    /// An output label that no input mentions.
    #[error("output label '{0}' does not appear in any input")]
    UnboundOutputSymbol(char),

    /// Direct element access outside the tensor bounds.
    #[error("index {index:?} out of range for shape {shape:?}")]
    IndexOutOfRange { index: Vec<usize>, shape: Vec<usize> },

    /// A context was requested from a backend that is not available.
    #[error("backend '{0}' is not available")]
    BackendUnavailable(String),

    /// A unit of work failed while running on a backend.
    #[error("operation failed on backend '{backend}': {cause}")]
    OperationFailed {
        backend: String,
        #[source]
        cause: BoxError,
    },

    /// `run` was called on a context that has already been released.
    #[error("execution context for backend '{0}' is closed")]
    ContextClosed(String),
}

impl Error {
    pub(crate) fn syntax(spec: &str, reason: impl Into<String>) -> Self {
        Error::SpecSyntax {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Error::ShapeMismatch(message.into())
    }

    pub(crate) fn failed(backend: &str, cause: impl Into<BoxError>) -> Self {
        Error::OperationFailed {
            backend: backend.to_string(),
            cause: cause.into(),
        }
    }

    /// True for the errors produced while validating a request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::SpecSyntax { .. }
                | Error::ShapeMismatch(_)
                | Error::DimensionMismatch { .. }
                | Error::UnboundOutputSymbol(_)
        )
    }
}
