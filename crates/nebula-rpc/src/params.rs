//! Typed access to command payloads.

use std::ops::RangeInclusive;

use serde_json::{Map, Value};

use crate::errors::RpcError;

/// Maximum accepted length of a power plan GUID, in bytes.
pub const MAX_GUID_LENGTH: usize = 128;

/// Accepted display width/height in pixels.
pub const DIMENSION_RANGE: RangeInclusive<u32> = 1..=16_384;

/// Accepted refresh rate in Hz.
pub const RATE_RANGE: RangeInclusive<u32> = 1..=1_000;

/// Accepted display ids.
pub const DISPLAY_ID_RANGE: RangeInclusive<u32> = 0..=u32::MAX;

/// Accepted process ids.
pub const PID_RANGE: RangeInclusive<u32> = 1..=u32::MAX;

/// Action-specific parameters of a [`Command`](crate::Command).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Wrap a decoded JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Payload from any JSON value; non-objects give an empty payload.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    /// Raw field lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, field: &str) -> Result<&Value, RpcError> {
        self.0
            .get(field)
            .filter(|v| !v.is_null())
            .ok_or_else(|| RpcError::invalid_argument(field, format!("Missing required field '{field}'")))
    }

    /// Required integer field within `range`.
    pub fn require_u32(&self, field: &str, range: RangeInclusive<u32>) -> Result<u32, RpcError> {
        let out_of_range = || {
            RpcError::invalid_argument(
                field,
                format!(
                    "Field '{field}' must be between {} and {}",
                    range.start(),
                    range.end()
                ),
            )
        };

        let Value::Number(number) = self.require(field)? else {
            return Err(RpcError::invalid_argument(
                field,
                format!("Field '{field}' must be an integer"),
            ));
        };
        if let Some(n) = number.as_u64() {
            let n = u32::try_from(n).map_err(|_| out_of_range())?;
            return if range.contains(&n) {
                Ok(n)
            } else {
                Err(out_of_range())
            };
        }
        if number.is_i64() {
            return Err(out_of_range());
        }
        Err(RpcError::invalid_argument(
            field,
            format!("Field '{field}' must be an integer"),
        ))
    }

    /// Required non-empty string field of at most `max_len` bytes.
    pub fn require_str(&self, field: &str, max_len: usize) -> Result<&str, RpcError> {
        let value = self.require(field)?.as_str().ok_or_else(|| {
            RpcError::invalid_argument(field, format!("Field '{field}' must be a string"))
        })?;
        if value.trim().is_empty() {
            return Err(RpcError::invalid_argument(
                field,
                format!("Field '{field}' must not be empty"),
            ));
        }
        if value.len() > max_len {
            return Err(RpcError::invalid_argument(
                field,
                format!(
                    "Field '{field}' exceeds maximum length ({} > {max_len})",
                    value.len()
                ),
            ));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Payload {
        Payload::from_value(value)
    }

    fn field_of(err: &RpcError) -> &str {
        match err {
            RpcError::InvalidArgument { field, .. } => field,
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn u32_in_range() {
        let p = payload(json!({"width": 1920}));
        assert_eq!(p.require_u32("width", DIMENSION_RANGE).unwrap(), 1920);
    }

    #[test]
    fn u32_missing_names_field() {
        let err = payload(json!({})).require_u32("pid", PID_RANGE).unwrap_err();
        assert_eq!(field_of(&err), "pid");
        assert_eq!(err.to_string(), "Missing required field 'pid'");
    }

    #[test]
    fn u32_null_is_missing() {
        let err = payload(json!({"pid": null})).require_u32("pid", PID_RANGE).unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn u32_rejects_strings_and_floats() {
        let err = payload(json!({"rate": "60"})).require_u32("rate", RATE_RANGE).unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
        let err = payload(json!({"rate": 59.94})).require_u32("rate", RATE_RANGE).unwrap_err();
        assert_eq!(field_of(&err), "rate");
    }

    #[test]
    fn u32_rejects_negative_and_oversized() {
        let err = payload(json!({"display_id": -1}))
            .require_u32("display_id", DISPLAY_ID_RANGE)
            .unwrap_err();
        assert_eq!(field_of(&err), "display_id");
        let err = payload(json!({"display_id": 5_000_000_000_u64}))
            .require_u32("display_id", DISPLAY_ID_RANGE)
            .unwrap_err();
        assert!(err.to_string().contains("between"));
    }

    #[test]
    fn u32_range_bounds() {
        let p = payload(json!({"width": 0, "height": 16_385, "pid": 0, "rate": 1000}));
        assert!(p.require_u32("width", DIMENSION_RANGE).is_err());
        assert!(p.require_u32("height", DIMENSION_RANGE).is_err());
        assert!(p.require_u32("pid", PID_RANGE).is_err());
        assert_eq!(p.require_u32("rate", RATE_RANGE).unwrap(), 1000);
    }

    #[test]
    fn str_ok() {
        let p = payload(json!({"guid": "381b4222-f694-41f0-9685-ff5bb260df2e"}));
        assert_eq!(
            p.require_str("guid", MAX_GUID_LENGTH).unwrap(),
            "381b4222-f694-41f0-9685-ff5bb260df2e"
        );
    }

    #[test]
    fn str_rejects_empty_wrong_type_and_long() {
        let err = payload(json!({"guid": "  "})).require_str("guid", MAX_GUID_LENGTH).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
        let err = payload(json!({"guid": 5})).require_str("guid", MAX_GUID_LENGTH).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
        let long = "g".repeat(MAX_GUID_LENGTH + 1);
        let err = payload(json!({"guid": long})).require_str("guid", MAX_GUID_LENGTH).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum length"));
    }

    #[test]
    fn from_value_non_object_is_empty() {
        assert!(Payload::from_value(json!([1, 2])).is_empty());
    }
}
