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

//! The reference engine's value domain.
//!
//! Values are cheaply-cloned handles (`Rc`) over an enum. Cloning a `Value`
//! bumps a reference count rather than copying data, which is what lets the
//! stable reference table (`scriptbridge-runtime`) satisfy its "keep alive"
//! guarantee by simply retaining a clone.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    context::Context,
    error::{NotCallableSnafu, Result},
};

/// A host or script-origin callable.
pub struct FunctionData {
    pub name: String,
    pub arity: usize,
    #[allow(clippy::type_complexity)]
    callback: Box<dyn Fn(&mut dyn Context, &Value, &[Value]) -> Result<Value>>,
}

impl FunctionData {
    pub fn new<F>(name: impl Into<String>, arity: usize, callback: F) -> Self
    where
        F: Fn(&mut dyn Context, &Value, &[Value]) -> Result<Value> + 'static,
    {
        FunctionData {
            name: name.into(),
            arity,
            callback: Box::new(callback),
        }
    }
}

/// An ordered, string-keyed property map, used for both `Value::Object` and
/// `Value::Array` index storage backing.
pub type PropertyMap = IndexMap<String, Value>;

/// A value in the reference engine's domain.
///
/// Variants mirror `undefined`, `null`, `boolean`, `number`, `string`,
/// `array`, `object`, and `function` from §3 of the data model.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<PropertyMap>>),
    Function(Rc<FunctionData>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self { Value::String(s.into()) }

    pub fn object() -> Self { Value::Object(Rc::new(RefCell::new(PropertyMap::new()))) }

    pub fn array() -> Self { Value::Array(Rc::new(RefCell::new(Vec::new()))) }

    pub fn function<F>(name: impl Into<String>, arity: usize, callback: F) -> Self
    where
        F: Fn(&mut dyn Context, &Value, &[Value]) -> Result<Value> + 'static,
    {
        Value::Function(Rc::new(FunctionData::new(name, arity, callback)))
    }

    pub fn is_undefined(&self) -> bool { matches!(self, Value::Undefined) }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn is_object(&self) -> bool { matches!(self, Value::Object(_) | Value::Array(_)) }

    pub fn is_callable(&self) -> bool { matches!(self, Value::Function(_)) }

    /// Identity pointer used by the `"jx"` codec to detect reference cycles.
    /// `None` for value types that cannot participate in a cycle.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Array(rc) => Some(Rc::as_ptr(rc) as usize),
            _ => None,
        }
    }

    pub fn get_prop(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.borrow().get(key).cloned(),
            Value::Array(arr) => {
                if key == "length" {
                    return Some(Value::Number(arr.borrow().len() as f64));
                }
                key.parse::<usize>()
                    .ok()
                    .and_then(|i| arr.borrow().get(i).cloned())
            }
            _ => None,
        }
    }

    pub fn set_prop(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self {
            Value::Object(map) => {
                map.borrow_mut().insert(key, value);
            }
            Value::Array(arr) => {
                if let Ok(i) = key.parse::<usize>() {
                    let mut arr = arr.borrow_mut();
                    if i >= arr.len() {
                        arr.resize(i + 1, Value::Undefined);
                    }
                    arr[i] = value;
                }
            }
            _ => {}
        }
    }

    pub fn delete_prop(&self, key: &str) {
        match self {
            Value::Object(map) => {
                map.borrow_mut().shift_remove(key);
            }
            Value::Array(arr) => {
                if let Ok(i) = key.parse::<usize>() {
                    let mut arr = arr.borrow_mut();
                    if i < arr.len() {
                        arr[i] = Value::Undefined;
                    }
                }
            }
            _ => {}
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{n:.0}")
                } else {
                    n.to_string()
                }
            }
            Value::String(s) => s.to_string(),
            Value::Array(arr) => {
                let parts: Vec<String> =
                    arr.borrow().iter().map(Value::to_display_string).collect();
                parts.join(",")
            }
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name),
        }
    }

    /// The `pcall`/`pnew` equivalent: always trapped, never panics across the
    /// call boundary.
    pub fn call(&self, ctx: &mut dyn Context, this: &Value, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(f) => (f.callback)(ctx, this, args),
            _ => NotCallableSnafu.fail(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(arr) => write!(f, "Array(len={})", arr.borrow().len()),
            Value::Object(map) => write!(f, "Object(keys={})", map.borrow().len()),
            Value::Function(func) => write!(f, "Function({})", func.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_round_trips_properties() {
        let obj = Value::object();
        obj.set_prop("a", Value::Number(1.0));
        assert_eq!(obj.get_prop("a").unwrap().to_display_string(), "1");
        obj.delete_prop("a");
        assert!(obj.get_prop("a").is_none());
    }

    #[test]
    fn array_grows_on_sparse_index() {
        let arr = Value::array();
        arr.set_prop("2", Value::Bool(true));
        assert_eq!(arr.get_prop("length").unwrap().to_display_string(), "3");
        assert!(arr.get_prop("0").unwrap().is_undefined());
    }

    #[test]
    fn non_callable_call_errors() {
        struct NoopCtx;
        impl Context for NoopCtx {
            fn global(&self) -> Value { Value::Undefined }

            fn set_global(&mut self, _value: Value) {}

            fn stash(&mut self) -> &mut dyn crate::stash::Stash { unimplemented!() }

            fn eval(&mut self, _expr: &str) -> Result<Value> { unimplemented!() }

            fn encode(&self, _value: &Value, _format: &str) -> Result<String> { unimplemented!() }

            fn decode(&self, _text: &str, _format: &str) -> Result<Value> { unimplemented!() }
        }
        let mut ctx = NoopCtx;
        let result = Value::Number(1.0).call(&mut ctx, &Value::Undefined, &[]);
        assert!(result.is_err());
    }
}
