//! Conversions between [`Value`] and `serde_json::Value`.
//!
//! JSON has no integer width or undef, so the mapping is lossy in places:
//! integers outside `i32` become reals, `null` maps to undef, and
//! non-finite reals become `null`.

use crate::value::{Map, Value};

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Undef,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(object) => Value::Map(
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect::<Map>(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Undef => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Real(r) => serde_json::Number::from_f64(*r)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_value() {
        let json = serde_json::json!({
            "command": "move",
            "reply": null,
            "chest": { "local_rot": [0.0, 0.5, 1] },
            "big": 5_000_000_000_i64,
        });

        let value = Value::from(&json);
        assert_eq!(value.get("command").and_then(Value::as_str), Some("move"));
        assert!(value.get("reply").unwrap().is_undef());
        let rot = value.get("chest").and_then(|c| c.get("local_rot")).unwrap();
        assert_eq!(
            rot.as_array().unwrap(),
            &[Value::Real(0.0), Value::Real(0.5), Value::Integer(1)]
        );
        assert_eq!(value.get("big"), Some(&Value::Real(5_000_000_000.0)));
    }

    #[test]
    fn value_to_json() {
        let value = Value::from(vec![
            Value::Undef,
            Value::Integer(3),
            Value::Real(f64::NAN),
            Value::from("x"),
        ]);
        assert_eq!(
            serde_json::Value::from(&value),
            serde_json::json!([null, 3, null, "x"])
        );
    }
}
