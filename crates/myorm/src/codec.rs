//! Conversion between stored column values and property values.
//!
//! Booleans are stored as `1`/`0`; object properties are stored as JSON text.
//! A `NULL` object is stored as `""`, and `""` does not decode as JSON, so it
//! reads back as `NULL`.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Custom JSON transform applied to object properties.
pub type JsonHook = Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Semantic type of a property, as far as storage is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyKind {
    Boolean,
    Object,
    /// Stored as is.
    #[default]
    Passthrough,
}

/// Property descriptor handed to the codec.
#[derive(Clone, Default)]
pub struct Property {
    pub kind: PropertyKind,
    /// Applied to an object before it is serialized.
    pub to_json: Option<JsonHook>,
    /// Applied to decoded JSON before it is returned.
    pub from_json: Option<JsonHook>,
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("kind", &self.kind)
            .field("to_json", &self.to_json.is_some())
            .field("from_json", &self.from_json.is_some())
            .finish()
    }
}

impl Property {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn boolean() -> Self {
        Self::new(PropertyKind::Boolean)
    }

    pub fn object() -> Self {
        Self::new(PropertyKind::Object)
    }

    pub fn passthrough() -> Self {
        Self::new(PropertyKind::Passthrough)
    }

    pub fn to_json<F>(mut self, hook: F) -> Self
    where
        F: Fn(serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        self.to_json = Some(Arc::new(hook));
        self
    }

    pub fn from_json<F>(mut self, hook: F) -> Self
    where
        F: Fn(serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        self.from_json = Some(Arc::new(hook));
        self
    }
}

/// Convert a stored value into its property value.
///
/// Object decoding failures are logged and yield [`Value::Null`]; use
/// [`try_value_to_property`] to get the error instead.
pub fn value_to_property(value: Value, property: &Property) -> Value {
    match try_value_to_property(value, property) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(target: "myorm.codec", error = %err, "failed to decode object property");
            Value::Null
        }
    }
}

/// Like [`value_to_property`], but surfaces decoding failures.
pub fn try_value_to_property(value: Value, property: &Property) -> OrmResult<Value> {
    match property.kind {
        PropertyKind::Boolean => Ok(Value::Bool(value.is_truthy())),
        PropertyKind::Object => {
            let json = match value {
                Value::Null => serde_json::Value::Null,
                Value::Json(json) => json,
                Value::Text(text) => decode_json(text.as_bytes())?,
                Value::Bytes(bytes) => decode_json(&bytes)?,
                Value::Int(n) => serde_json::Value::from(n),
                Value::UInt(n) => serde_json::Value::from(n),
                Value::Float(f) => decode_json(f.to_string().as_bytes())?,
                Value::Bool(b) => serde_json::Value::Bool(b),
                Value::Timestamp(ts) => {
                    return Err(OrmError::decode(format!(
                        "timestamp {ts} is not a JSON document"
                    )));
                }
            };
            if json.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::Json(match &property.from_json {
                Some(hook) => hook(json),
                None => json,
            }))
        }
        PropertyKind::Passthrough => Ok(value),
    }
}

fn decode_json(raw: &[u8]) -> OrmResult<serde_json::Value> {
    serde_json::from_slice(raw).map_err(|e| OrmError::decode(format!("invalid JSON: {e}")))
}

/// Convert a property value into its stored form.
pub fn property_to_value(value: Value, property: &Property) -> OrmResult<Value> {
    match property.kind {
        PropertyKind::Boolean => Ok(Value::Int(i64::from(value.is_truthy()))),
        PropertyKind::Object => {
            let json = match value {
                Value::Null => return Ok(Value::Text(String::new())),
                Value::Json(json) => json,
                Value::Text(text) => serde_json::Value::String(text),
                Value::Bool(b) => serde_json::Value::Bool(b),
                Value::Int(n) => serde_json::Value::from(n),
                Value::UInt(n) => serde_json::Value::from(n),
                Value::Float(f) => serde_json::Value::from(f),
                Value::Timestamp(ts) => serde_json::to_value(ts)?,
                Value::Bytes(bytes) => serde_json::to_value(bytes)?,
            };
            let json = match &property.to_json {
                Some(hook) => hook(json),
                None => json,
            };
            Ok(Value::Text(serde_json::to_string(&json)?))
        }
        PropertyKind::Passthrough => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_round_trip() {
        let prop = Property::boolean();
        for b in [true, false] {
            let stored = property_to_value(Value::Bool(b), &prop).unwrap();
            assert_eq!(stored, Value::Int(i64::from(b)));
            assert_eq!(value_to_property(stored, &prop), Value::Bool(b));
        }
    }

    #[test]
    fn boolean_truthiness() {
        let prop = Property::boolean();
        assert_eq!(value_to_property(Value::Null, &prop), Value::Bool(false));
        assert_eq!(value_to_property(Value::from(""), &prop), Value::Bool(false));
        assert_eq!(value_to_property(Value::from("no"), &prop), Value::Bool(true));
        assert_eq!(value_to_property(Value::UInt(3), &prop), Value::Bool(true));
    }

    #[test]
    fn object_round_trip() {
        let prop = Property::object();
        let stored = property_to_value(Value::Json(json!({"a": [1, 2]})), &prop).unwrap();
        assert_eq!(stored, Value::Text(r#"{"a":[1,2]}"#.to_string()));
        assert_eq!(
            value_to_property(stored, &prop),
            Value::Json(json!({"a": [1, 2]}))
        );
    }

    #[test]
    fn null_object_asymmetry() {
        let prop = Property::object();
        assert_eq!(
            property_to_value(Value::Null, &prop).unwrap(),
            Value::Text(String::new())
        );
        assert_eq!(value_to_property(Value::from(""), &prop), Value::Null);
        assert!(matches!(
            try_value_to_property(Value::from(""), &prop),
            Err(OrmError::DecodeFailed(_))
        ));
        assert_eq!(value_to_property(Value::Null, &prop), Value::Null);
    }

    #[test]
    fn object_hooks() {
        let prop = Property::object()
            .to_json(|v| json!({ "wrapped": v }))
            .from_json(|v| v["wrapped"].clone());
        let stored = property_to_value(Value::Json(json!(5)), &prop).unwrap();
        assert_eq!(stored, Value::Text(r#"{"wrapped":5}"#.to_string()));
        assert_eq!(value_to_property(stored, &prop), Value::Json(json!(5)));
    }

    #[test]
    fn object_from_bytes_and_numbers() {
        let prop = Property::object();
        assert_eq!(
            value_to_property(Value::Bytes(b"[true]".to_vec()), &prop),
            Value::Json(json!([true]))
        );
        assert_eq!(value_to_property(Value::Int(7), &prop), Value::Json(json!(7)));
    }

    #[test]
    fn passthrough_is_identity() {
        let prop = Property::passthrough();
        let v = Value::from("x");
        assert_eq!(value_to_property(v.clone(), &prop), v);
        assert_eq!(property_to_value(v.clone(), &prop).unwrap(), v);
    }
}
