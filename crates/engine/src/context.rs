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

//! The interpreter contract and one concrete reference implementation.

use crate::{
    codec, error::Result, stash::Stash,
    value::Value,
};

/// A boxed host closure installable as a `Value::Function`.
///
/// Blanket-implemented for any closure of the right shape; the arity hint
/// lives alongside the closure in `FunctionData`, not in this trait, so that
/// a trait object doesn't need to carry it separately.
pub trait NativeFunction: Fn(&mut dyn Context, &Value, &[Value]) -> Result<Value> {}

impl<F> NativeFunction for F where F: Fn(&mut dyn Context, &Value, &[Value]) -> Result<Value> {}

/// Owns a `Value` representing the global object and a [`Stash`] for rooting
/// values independent of normal reachability.
///
/// Every `EventLoop` in `scriptbridge-runtime` owns exactly one `Context` for
/// its lifetime and touches it only from the loop's own thread.
pub trait Context {
    fn global(&self) -> Value;

    /// Replaces the global object wholesale. Used by the worker subsystem's
    /// `DedicatedWorkerGlobalScope` step, which must *replace* the global
    /// rather than graft onto it.
    fn set_global(&mut self, value: Value);

    fn new_object(&self) -> Value { Value::object() }

    fn new_array(&self) -> Value { Value::array() }

    fn new_function<F>(&self, name: &str, arity: usize, callback: F) -> Value
    where
        F: Fn(&mut dyn Context, &Value, &[Value]) -> Result<Value> + 'static,
        Self: Sized,
    {
        Value::function(name, arity, callback)
    }

    /// The heap-stash equivalent: a root-reachable, host-addressable slot
    /// table.
    fn stash(&mut self) -> &mut dyn Stash;

    /// A small expression form sufficient for tests and for the reference
    /// worker loader. Not a general-purpose scripting language: it resolves
    /// literals and dotted-path lookups against the global object, plus a
    /// `throw "message"` form for exercising failure paths.
    fn eval(&mut self, expr: &str) -> Result<Value>;

    /// The structured codec, keyed by format name. The runtime uses `"jx"`.
    fn encode(&self, value: &Value, format: &str) -> Result<String>;

    fn decode(&self, text: &str, format: &str) -> Result<Value>;
}

/// The one concrete implementation of [`Context`] shipped in this repository.
///
/// Sufficient to host and exercise `scriptbridge-runtime` end to end; not a
/// general-purpose scripting language.
pub struct RefContext {
    global: Value,
    stash: crate::stash::SlotStash,
}

impl RefContext {
    /// Builds a context whose global already carries the reference engine's
    /// `Object`/`Error`/`print`/`Codec` built-ins (see [`crate::builtins`]).
    pub fn new() -> Self {
        let ctx = RefContext {
            global: Value::object(),
            stash: crate::stash::SlotStash::new(),
        };
        crate::builtins::install(&ctx);
        ctx
    }
}

impl Default for RefContext {
    fn default() -> Self { Self::new() }
}

impl Context for RefContext {
    fn global(&self) -> Value { self.global.clone() }

    fn set_global(&mut self, value: Value) { self.global = value; }

    fn stash(&mut self) -> &mut dyn Stash { &mut self.stash }

    fn eval(&mut self, expr: &str) -> Result<Value> {
        let expr = expr.trim();
        if expr.is_empty() {
            return crate::error::EvalSnafu {
                message: "empty expression",
            }
            .fail();
        }
        if let Some(message) = expr.strip_prefix("throw ") {
            return crate::error::ThrownSnafu {
                message: unquote(message.trim()),
                stack: None,
            }
            .fail();
        }
        if expr == "undefined" {
            return Ok(Value::Undefined);
        }
        if expr == "null" {
            return Ok(Value::Null);
        }
        if expr == "true" {
            return Ok(Value::Bool(true));
        }
        if expr == "false" {
            return Ok(Value::Bool(false));
        }
        if let Ok(n) = expr.parse::<f64>() {
            return Ok(Value::Number(n));
        }
        if expr.starts_with('"') || expr.starts_with('\'') {
            let quote = expr.as_bytes()[0] as char;
            if expr.len() >= 2 && expr.ends_with(quote) {
                return Ok(Value::string(unquote(expr)));
            }
            return crate::error::EvalSnafu {
                message: format!("unterminated string literal: {expr}"),
            }
            .fail();
        }
        // Dotted-path lookup against the global object, e.g. `self.onmessage`.
        if !expr.split('.').all(is_identifier) {
            return crate::error::EvalSnafu {
                message: format!("unparseable expression: {expr}"),
            }
            .fail();
        }
        let mut current = self.global();
        for segment in expr.split('.') {
            match current.get_prop(segment) {
                Some(value) => current = value,
                None => return Ok(Value::Undefined),
            }
        }
        Ok(current)
    }

    fn encode(&self, value: &Value, format: &str) -> Result<String> { codec::encode(value, format) }

    fn decode(&self, text: &str, format: &str) -> Result<Value> { codec::decode(text, format) }
}

/// Whether `s` is a valid bare identifier segment for dotted-path lookup.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Strips a single layer of matching `"`/`'` quotes, if present.
fn unquote(text: &str) -> String {
    if text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"')) || (text.starts_with('\'') && text.ends_with('\'')))
    {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_resolves_literals() {
        let mut ctx = RefContext::new();
        assert!(ctx.eval("undefined").unwrap().is_undefined());
        assert_eq!(ctx.eval("42").unwrap().to_display_string(), "42");
        assert_eq!(ctx.eval("\"hi\"").unwrap().to_display_string(), "hi");
    }

    #[test]
    fn eval_resolves_dotted_global_path() {
        let mut ctx = RefContext::new();
        let inner = ctx.new_object();
        inner.set_prop("name", Value::string("worker"));
        ctx.global().set_prop("self", inner);
        assert_eq!(ctx.eval("self.name").unwrap().to_display_string(), "worker");
    }

    #[test]
    fn eval_throw_surfaces_a_thrown_script_error() {
        let mut ctx = RefContext::new();
        let err = ctx.eval("throw \"boom\"").unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn eval_rejects_unparseable_expressions() {
        let mut ctx = RefContext::new();
        assert!(matches!(ctx.eval("").unwrap_err(), crate::error::ScriptError::Eval { .. }));
        assert!(matches!(ctx.eval("\"unterminated").unwrap_err(), crate::error::ScriptError::Eval { .. }));
        assert!(matches!(ctx.eval("1 + 1").unwrap_err(), crate::error::ScriptError::Eval { .. }));
    }

    #[test]
    fn set_global_replaces_wholesale() {
        let mut ctx = RefContext::new();
        ctx.global().set_prop("old", Value::Bool(true));
        let replacement = ctx.new_object();
        ctx.set_global(replacement);
        assert!(ctx.global().get_prop("old").is_none());
    }
}
