//! Error types for local PCA and correlation partitioning.

use thiserror::Error;

/// Errors raised by the PCA pipeline and the partitioning orchestrator.
///
/// Functions in this crate return `anyhow::Result`; these variants travel
/// inside the `anyhow::Error` and can be recovered with
/// `err.downcast_ref::<CopacError>()`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CopacError {
    /// Invalid configuration, detected when a component is built.
    #[error("Invalid parameter: {message}")]
    Parameter {
        /// Description of what's wrong with the parameter
        message: String,
    },

    /// Non-finite input or a failed decomposition.
    #[error("Numeric failure: {message}")]
    Numeric {
        /// Description of the numeric failure
        message: String,
    },

    /// An internal invariant was violated.
    #[error("Fatal state: {message}")]
    FatalState {
        /// Description of the violated invariant
        message: String,
    },

    /// The run was cancelled before it completed.
    #[error("Orchestration cancelled")]
    Cancelled,
}

impl CopacError {
    /// Create a Parameter error.
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter {
            message: message.into(),
        }
    }

    /// Create a Numeric error.
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::Numeric {
            message: message.into(),
        }
    }

    /// Create a FatalState error.
    pub fn fatal_state(message: impl Into<String>) -> Self {
        Self::FatalState {
            message: message.into(),
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric { .. })
    }

    pub fn is_fatal_state(&self) -> bool {
        matches!(self, Self::FatalState { .. })
    }
}

/// Returns the `CopacError` carried by an `anyhow::Error`, if any.
pub fn copac_error(err: &anyhow::Error) -> Option<&CopacError> {
    err.downcast_ref::<CopacError>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let errors = [
            (CopacError::parameter("alpha must be in (0, 1]"), "Invalid parameter"),
            (CopacError::numeric("NaN at (0, 1)"), "Numeric failure"),
            (CopacError::fatal_state("id 4 missing"), "Fatal state"),
            (CopacError::Cancelled, "cancelled"),
        ];
        for (error, fragment) in errors {
            assert!(error.to_string().contains(fragment), "{error}");
        }
    }

    #[test]
    fn test_downcast_through_context() {
        use anyhow::Context;

        let result: anyhow::Result<()> = Err(CopacError::numeric("singular").into());
        let err = result.context("partition 2").unwrap_err();
        let inner = copac_error(&err).expect("typed error survives context");
        assert!(inner.is_numeric());
        assert!(!inner.is_parameter());
    }
}
