//! Router error type and startup validation errors.

use nebula_core::CapabilityError;

use crate::types::ErrorKind;

/// A command failure, converted to an error envelope at the router boundary.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// The inbound message is not a command.
    #[error("{message}")]
    InvalidMessage {
        /// What was wrong with the frame.
        message: String,
    },

    /// The action is not in the supported table.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The action as received.
        action: String,
    },

    /// A payload field is missing, mistyped or out of range.
    #[error("{message}")]
    InvalidArgument {
        /// Offending field.
        field: String,
        /// Description naming the field.
        message: String,
    },

    /// The referenced entity does not exist.
    #[error("{message}")]
    NotFound {
        /// Description.
        message: String,
    },

    /// The provider could not carry out a valid request.
    #[error("{message}")]
    OperationFailed {
        /// Description.
        message: String,
    },

    /// Unclassified failure, original message preserved.
    #[error("{message}")]
    Internal {
        /// Diagnostic message.
        message: String,
    },
}

impl RpcError {
    /// Envelope kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMessage { .. } => ErrorKind::InvalidMessage,
            Self::UnknownAction { .. } => ErrorKind::UnknownAction,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
            Self::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// Build an `InvalidArgument` error for `field`.
    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

impl From<CapabilityError> for RpcError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::NotFound { message } => Self::NotFound { message },
            CapabilityError::InvalidArgument { field, message } => {
                Self::InvalidArgument { field, message }
            }
            CapabilityError::OperationFailed { message }
            | CapabilityError::Unsupported { message } => Self::OperationFailed { message },
            CapabilityError::Internal { message } => Self::Internal { message },
        }
    }
}

/// The action table is incomplete.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Some actions have no handler.
    #[error("no handler registered for actions: {}", .missing.join(", "))]
    MissingHandlers {
        /// Wire names of the unhandled actions.
        missing: Vec<&'static str>,
    },
}
