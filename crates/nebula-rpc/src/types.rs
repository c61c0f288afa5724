//! Wire types: inbound commands and outbound response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::RpcError;
use crate::params::Payload;

/// Error classification carried in the `error` field of an error envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The inbound message could not be decoded as a command.
    InvalidMessage,
    /// The `action` is not in the supported table.
    UnknownAction,
    /// A required payload field is missing or malformed.
    InvalidArgument,
    /// The referenced display, process or plan does not exist.
    NotFound,
    /// The provider failed to execute a valid request.
    OperationFailed,
    /// Unclassified failure.
    InternalError,
}

impl ErrorKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidMessage => "InvalidMessage",
            Self::UnknownAction => "UnknownAction",
            Self::InvalidArgument => "InvalidArgument",
            Self::NotFound => "NotFound",
            Self::OperationFailed => "OperationFailed",
            Self::InternalError => "InternalError",
        }
    }
}

/// Fields of a success envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuccessBody(Map<String, Value>);

impl SuccessBody {
    /// `{"action": "pong"}`.
    pub fn pong() -> Self {
        let mut map = Map::new();
        let _ = map.insert("action".into(), Value::from("pong"));
        Self(map)
    }

    /// `{"status": "success", "message": ...}` for a completed mutation.
    pub fn status(message: impl Into<String>) -> Self {
        let mut map = success_map();
        let _ = map.insert("message".into(), Value::String(message.into()));
        Self(map)
    }

    /// `{"status": "success", "action": tag, key: items}` for a listing.
    pub fn listing<T: Serialize + ?Sized>(
        tag: &str,
        key: &str,
        items: &T,
    ) -> Result<Self, RpcError> {
        let value = serde_json::to_value(items).map_err(|e| RpcError::Internal {
            message: format!("failed to serialize {key}: {e}"),
        })?;
        let mut map = success_map();
        let _ = map.insert("action".into(), Value::from(tag));
        let _ = map.insert(key.into(), value);
        Ok(Self(map))
    }

    /// Field lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `action` tag, if any.
    pub fn action_tag(&self) -> Option<&str> {
        self.0.get("action").and_then(Value::as_str)
    }
}

fn success_map() -> Map<String, Value> {
    let mut map = Map::new();
    let _ = map.insert("status".into(), Value::from("success"));
    map
}

/// Exactly one of these is emitted per command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    /// `{"error": kind, "message": text}`.
    Error {
        /// Classification.
        error: ErrorKind,
        /// Human-readable explanation.
        message: String,
    },
    /// `{"status": "success", ...}` or `{"action": "pong"}`.
    Success(SuccessBody),
}

impl ResponseEnvelope {
    /// Build an error envelope.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            error: kind,
            message: message.into(),
        }
    }

    /// Whether this is a success envelope.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Error kind, if this is an error envelope.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { error, .. } => Some(*error),
            Self::Success(_) => None,
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"error":"InternalError","message":"failed to encode response: {e}"}}"#)
        })
    }
}

impl From<SuccessBody> for ResponseEnvelope {
    fn from(body: SuccessBody) -> Self {
        Self::Success(body)
    }
}

impl From<RpcError> for ResponseEnvelope {
    fn from(err: RpcError) -> Self {
        Self::error(err.kind(), err.to_string())
    }
}

/// A decoded inbound message.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// Requested action name, not yet validated against the table.
    pub action: String,
    /// Action-specific parameters.
    pub payload: Payload,
}

impl Command {
    /// Decode a text frame.
    ///
    /// The frame must be a JSON object with a string `action`. All other
    /// top-level keys form the payload; a nested `payload` object is merged
    /// underneath them, top-level keys winning.
    pub fn decode(text: &str) -> Result<Self, RpcError> {
        let value: Value = serde_json::from_str(text).map_err(|e| RpcError::InvalidMessage {
            message: format!("Invalid JSON: {e}"),
        })?;
        let Value::Object(mut fields) = value else {
            return Err(RpcError::InvalidMessage {
                message: "Message must be a JSON object".into(),
            });
        };

        let action = match fields.remove("action") {
            Some(Value::String(action)) => action,
            Some(_) => {
                return Err(RpcError::InvalidMessage {
                    message: "Field 'action' must be a string".into(),
                });
            }
            None => {
                return Err(RpcError::InvalidMessage {
                    message: "Missing 'action' field".into(),
                });
            }
        };

        let mut payload = match fields.remove("payload") {
            Some(Value::Object(nested)) => nested,
            Some(other) => {
                let _ = fields.insert("payload".into(), other);
                Map::new()
            }
            None => Map::new(),
        };
        payload.extend(fields);

        Ok(Self {
            action,
            payload: Payload::new(payload),
        })
    }
}
