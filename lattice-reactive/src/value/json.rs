//! JSON interop for building fixtures and taking snapshots.

use indexmap::IndexSet;
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use super::{ObjectId, ObjectKind, PropertyKey, Value};
use crate::error::{ReactiveError, Result};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Value {
    /// Build raw records, arrays and primitives from JSON.
    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::from(s.as_str()),
            JsonValue::Array(items) => Value::array(items.iter().map(Value::from_json)),
            JsonValue::Object(fields) => Value::record(
                fields
                    .iter()
                    .map(|(key, value)| (key.as_str(), Value::from_json(value))),
            ),
        }
    }

    /// Snapshot this value as JSON.
    ///
    /// Reads go through the value's own operations, so snapshotting a proxy
    /// inside a reader context tracks every key it visits. Values JSON cannot
    /// express (undefined, symbols, functions) become `null`. An object that
    /// contains itself fails with [`ReactiveError::CyclicValue`]; shared
    /// references that do not loop are written out at each occurrence.
    pub fn to_json(&self) -> Result<JsonValue> {
        self.to_json_within(&mut IndexSet::new())
    }

    /// `path` holds the innermost ids of the objects currently being written.
    fn to_json_within(&self, path: &mut IndexSet<ObjectId>) -> Result<JsonValue> {
        let obj = match self {
            Value::Undefined | Value::Null | Value::Symbol(_) => return Ok(JsonValue::Null),
            Value::Bool(b) => return Ok(JsonValue::Bool(*b)),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                return Ok(JsonValue::from(*n as i64));
            }
            Value::Number(n) => {
                return Ok(JsonNumber::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number));
            }
            Value::String(s) => return Ok(JsonValue::String(s.to_string())),
            Value::Object(obj) => obj,
        };

        let id = obj.innermost().id();
        if !path.insert(id) {
            return Err(ReactiveError::CyclicValue(format!("{:?}", obj)));
        }
        let json = match obj.target_kind() {
            ObjectKind::Array => (0..self.len())
                .map(|index| self.get(index).to_json_within(path))
                .collect::<Result<Vec<_>>>()
                .map(JsonValue::Array),
            ObjectKind::Object => {
                let mut fields = JsonMap::new();
                for key in self.own_keys() {
                    if let PropertyKey::Index(_) | PropertyKey::String(_) = key {
                        let value = self.get(&key).to_json_within(path)?;
                        fields.insert(key.to_string(), value);
                    }
                }
                Ok(JsonValue::Object(fields))
            }
            ObjectKind::Boxed => self.get("value").to_json_within(path),
            _ => Ok(JsonValue::Null),
        };
        path.pop();
        json
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().map_err(S::Error::custom)?.serialize(serializer)
    }
}
