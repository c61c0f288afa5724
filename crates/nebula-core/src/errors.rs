//! Typed failures returned by capability providers.

/// Failure of a capability provider call.
///
/// Every variant carries a human-readable message suitable for direct display
/// to the caller.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// The referenced display, process or plan does not exist.
    #[error("{message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// A request field was rejected by the provider.
    #[error("{message}")]
    InvalidArgument {
        /// Name of the offending field.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// The OS facility refused or failed to execute a valid request.
    #[error("{message}")]
    OperationFailed {
        /// Description of the failure.
        message: String,
    },

    /// The capability is not available on this host.
    #[error("{message}")]
    Unsupported {
        /// Description of what is missing.
        message: String,
    },

    /// Unclassified failure.
    #[error("{message}")]
    Internal {
        /// Original diagnostic message.
        message: String,
    },
}

impl CapabilityError {
    /// Build a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Build an `InvalidArgument` error naming `field`.
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an `OperationFailed` error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    /// Build an `Unsupported` error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Build an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::OperationFailed { .. } => "operation_failed",
            Self::Unsupported { .. } => "unsupported",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result alias for provider calls.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_message() {
        let err = CapabilityError::not_found("No process found with PID 42");
        assert_eq!(err.to_string(), "No process found with PID 42");
    }

    #[test]
    fn invalid_argument_keeps_field() {
        let err = CapabilityError::invalid_argument("width", "mode 1x1 is not supported");
        let CapabilityError::InvalidArgument { field, message } = &err else {
            panic!("expected InvalidArgument");
        };
        assert_eq!(field, "width");
        assert!(message.contains("1x1"));
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(CapabilityError::not_found("x").error_kind(), "not_found");
        assert_eq!(
            CapabilityError::operation_failed("x").error_kind(),
            "operation_failed"
        );
        assert_eq!(CapabilityError::unsupported("x").error_kind(), "unsupported");
        assert_eq!(CapabilityError::internal("x").error_kind(), "internal");
        assert_eq!(
            CapabilityError::invalid_argument("f", "x").error_kind(),
            "invalid_argument"
        );
    }
}
