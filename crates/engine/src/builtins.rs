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

//! The handful of globals the reference engine ships with: `Object`, `Error`,
//! `print`, and a `Codec` namespace mirroring [`Context::encode`]/`decode`.
//!
//! These are the properties the worker subsystem's `DedicatedWorkerGlobalScope`
//! carries over when it replaces a context's global object wholesale, so they
//! are installed unconditionally by [`crate::RefContext::new`] rather than
//! through a separate registration step.

use crate::{context::Context, value::Value};

pub fn install(ctx: &dyn Context) {
    let global = ctx.global();

    global.set_prop(
        "Object",
        Value::function("Object", 1, |ctx, _this, args| {
            let object = ctx.new_object();
            if let Some(Value::Object(source)) = args.first() {
                for (key, value) in source.borrow().iter() {
                    object.set_prop(key.clone(), value.clone());
                }
            }
            Ok(object)
        }),
    );

    global.set_prop(
        "Error",
        Value::function("Error", 1, |ctx, _this, args| {
            let message = args.first().map(Value::to_display_string).unwrap_or_default();
            let error = ctx.new_object();
            error.set_prop("name", Value::string("Error"));
            error.set_prop("message", Value::string(message));
            Ok(error)
        }),
    );

    global.set_prop(
        "print",
        Value::function("print", 0, |_ctx, _this, args| {
            let text = args.iter().map(Value::to_display_string).collect::<Vec<_>>().join(" ");
            tracing::info!(target: "print", "{text}");
            Ok(Value::Undefined)
        }),
    );

    let codec = ctx.new_object();
    codec.set_prop(
        "enc",
        Value::function("enc", 2, |ctx, _this, args| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            let format = args.get(1).map(Value::to_display_string).unwrap_or_else(|| "jx".to_string());
            Ok(Value::string(ctx.encode(&value, &format)?))
        }),
    );
    codec.set_prop(
        "dec",
        Value::function("dec", 2, |ctx, _this, args| {
            let text = args.first().map(Value::to_display_string).unwrap_or_default();
            let format = args.get(1).map(Value::to_display_string).unwrap_or_else(|| "jx".to_string());
            ctx.decode(&text, &format)
        }),
    );
    global.set_prop("Codec", codec);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RefContext;

    #[test]
    fn object_constructor_shallow_copies_its_argument() {
        let ctx = RefContext::new();
        let source = ctx.new_object();
        source.set_prop("a", Value::Number(1.0));
        let object_ctor = ctx.global().get_prop("Object").unwrap();
        let mut ctx = ctx;
        let copy = object_ctor.call(&mut ctx, &Value::Undefined, &[source]).unwrap();
        assert_eq!(copy.get_prop("a").unwrap().to_display_string(), "1");
    }

    #[test]
    fn error_constructor_builds_a_named_object() {
        let mut ctx = RefContext::new();
        let error_ctor = ctx.global().get_prop("Error").unwrap();
        let error = error_ctor.call(&mut ctx, &Value::Undefined, &[Value::string("boom")]).unwrap();
        assert_eq!(error.get_prop("name").unwrap().to_display_string(), "Error");
        assert_eq!(error.get_prop("message").unwrap().to_display_string(), "boom");
    }

    #[test]
    fn codec_round_trips_through_jx() {
        let mut ctx = RefContext::new();
        let codec = ctx.global().get_prop("Codec").unwrap();
        let enc = codec.get_prop("enc").unwrap();
        let dec = codec.get_prop("dec").unwrap();
        let encoded = enc.call(&mut ctx, &Value::Undefined, &[Value::Number(7.0), Value::string("jx")]).unwrap();
        let decoded = dec.call(&mut ctx, &Value::Undefined, &[encoded, Value::string("jx")]).unwrap();
        assert_eq!(decoded.to_display_string(), "7");
    }
}
