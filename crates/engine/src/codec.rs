// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The `"jx"` structured codec, JSON-backed.
//!
//! `undefined` encodes as JSON `null`; a decoded JSON `null` decodes back to
//! `Value::Null`. That asymmetry is the one lossy edge in the mapping and is
//! accepted rather than worked around.

use std::collections::HashSet;

use crate::{
    error::{DecodeSnafu, EncodeSnafu, Result, UnknownFormatSnafu},
    value::Value,
};

const FORMAT_JX: &str = "jx";

pub fn encode(value: &Value, format: &str) -> Result<String> {
    if format != FORMAT_JX {
        return UnknownFormatSnafu { format }.fail();
    }
    let mut on_stack = HashSet::new();
    let json = to_json(value, &mut on_stack)?;
    serde_json::to_string(&json).map_err(|err| {
        EncodeSnafu {
            message: err.to_string(),
        }
        .build()
    })
}

pub fn decode(text: &str, format: &str) -> Result<Value> {
    if format != FORMAT_JX {
        return UnknownFormatSnafu { format }.fail();
    }
    let json: serde_json::Value = serde_json::from_str(text).map_err(|err| {
        DecodeSnafu {
            message: err.to_string(),
        }
        .build()
    })?;
    Ok(from_json(&json))
}

fn to_json(value: &Value, on_stack: &mut HashSet<usize>) -> Result<serde_json::Value> {
    if let Some(id) = value.identity()
        && !on_stack.insert(id)
    {
        return EncodeSnafu {
            message: "cyclic value is not representable in \"jx\"",
        }
        .fail();
    }

    let result = match value {
        Value::Undefined | Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => Ok(serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)),
        Value::String(s) => Ok(serde_json::Value::String(s.to_string())),
        Value::Array(arr) => {
            let items = arr
                .borrow()
                .iter()
                .map(|item| to_json(item, on_stack))
                .collect::<Result<Vec<_>>>()?;
            Ok(serde_json::Value::Array(items))
        }
        Value::Object(map) => {
            let mut object = serde_json::Map::new();
            for (key, val) in map.borrow().iter() {
                object.insert(key.clone(), to_json(val, on_stack)?);
            }
            Ok(serde_json::Value::Object(object))
        }
        Value::Function(_) => EncodeSnafu {
            message: "function values are not representable in \"jx\"",
        }
        .fail(),
    };

    if let Some(id) = value.identity() {
        on_stack.remove(&id);
    }
    result
}

fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(items) => {
            let value = Value::array();
            for (i, item) in items.iter().enumerate() {
                value.set_prop(i.to_string(), from_json(item));
            }
            value
        }
        serde_json::Value::Object(map) => {
            let value = Value::object();
            for (key, item) in map {
                value.set_prop(key.clone(), from_json(item));
            }
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_object() {
        let obj = Value::object();
        obj.set_prop("name", Value::string("worker"));
        obj.set_prop("count", Value::Number(3.0));
        let encoded = encode(&obj, "jx").unwrap();
        let decoded = decode(&encoded, "jx").unwrap();
        assert_eq!(decoded.get_prop("name").unwrap().to_display_string(), "worker");
        assert_eq!(decoded.get_prop("count").unwrap().to_display_string(), "3");
    }

    #[test]
    fn undefined_encodes_as_null_and_decodes_as_null_value() {
        let encoded = encode(&Value::Undefined, "jx").unwrap();
        assert_eq!(encoded, "null");
        let decoded = decode(&encoded, "jx").unwrap();
        assert!(decoded.is_null());
    }

    #[test]
    fn cyclic_value_errors_instead_of_looping() {
        let obj = Value::object();
        obj.set_prop("self", obj.clone());
        let result = encode(&obj, "jx");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(encode(&Value::Null, "bson").is_err());
        assert!(decode("null", "bson").is_err());
    }
}
