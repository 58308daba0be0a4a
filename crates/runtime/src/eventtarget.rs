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

//! `Event`, `ErrorEvent`, and `EventTarget`: construction, listener
//! registration, and dispatch.
//!
//! Listener lists are snapshotted (the registered `Vec` of callback `Value`s
//! is cloned) before any listener runs, so removing a listener mid-dispatch
//! only affects later calls to `dispatchEvent`, never the dispatch already
//! in flight.

use scriptbridge_engine::{Context, Value};

use crate::{error::Result, event_loop::script_err};

const LISTENERS_KEY: &str = "__listeners";

/// Builds an `Event` instance: `{ type, target: undefined, ...init }`.
pub fn new_event(ctx: &dyn Context, kind: impl Into<String>, init: Option<&Value>) -> Value {
    let event = ctx.new_object();
    event.set_prop("type", Value::string(kind.into()));
    event.set_prop("target", Value::Undefined);
    if let Some(init) = init {
        if let Value::Object(_) = init {
            copy_props(init, &event);
        }
    }
    event
}

/// Builds an `ErrorEvent`, which inherits `Event`'s shape and adds `message`.
pub fn new_error_event(ctx: &dyn Context, message: impl Into<String>) -> Value {
    let event = new_event(ctx, "error", None);
    event.set_prop("message", Value::string(message.into()));
    event
}

fn copy_props(from: &Value, to: &Value) {
    if let Value::Object(map) = from {
        for (key, value) in map.borrow().iter() {
            to.set_prop(key.clone(), value.clone());
        }
    }
}

/// Builds an `EventTarget` instance: an object carrying `addEventListener`,
/// `removeEventListener`, and `dispatchEvent`.
pub fn new_event_target(ctx: &dyn Context) -> Value {
    let target = ctx.new_object();
    target.set_prop(LISTENERS_KEY, ctx.new_object());
    target.set_prop(
        "addEventListener",
        Value::function("addEventListener", 2, |_ctx, this, args| {
            add_event_listener(this, args)
        }),
    );
    target.set_prop(
        "removeEventListener",
        Value::function("removeEventListener", 2, |_ctx, this, args| {
            remove_event_listener(this, args)
        }),
    );
    target.set_prop(
        "dispatchEvent",
        Value::function("dispatchEvent", 1, |ctx, this, args| {
            let event = args.first().cloned().unwrap_or(Value::Undefined);
            dispatch_inner(ctx, this, &event)?;
            Ok(Value::Bool(true))
        }),
    );
    target
}

fn listeners_for(target: &Value, kind: &str) -> Value {
    let listeners = target.get_prop(LISTENERS_KEY).unwrap_or(Value::Undefined);
    match listeners.get_prop(kind) {
        Some(list) => list,
        None => {
            let list = Value::array();
            listeners.set_prop(kind, list.clone());
            list
        }
    }
}

fn add_event_listener(this: &Value, args: &[Value]) -> scriptbridge_engine::Result<Value> {
    let Some(Value::String(kind)) = args.first() else {
        return Ok(Value::Undefined);
    };
    let Some(callback) = args.get(1).filter(|value| value.is_callable()) else {
        return Ok(Value::Undefined);
    };
    let list = listeners_for(this, kind);
    let next_index = list.get_prop("length").map(|v| v.to_display_string()).unwrap_or_default();
    list.set_prop(next_index, callback.clone());
    Ok(Value::Undefined)
}

fn remove_event_listener(this: &Value, args: &[Value]) -> scriptbridge_engine::Result<Value> {
    let (Some(Value::String(kind)), Some(callback)) = (args.first(), args.get(1)) else {
        return Ok(Value::Undefined);
    };
    let list = listeners_for(this, kind);
    if let Value::Array(arr) = &list {
        arr.borrow_mut().retain(|existing| !same_function(existing, callback));
    }
    Ok(Value::Undefined)
}

fn same_function(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Function(a), Value::Function(b)) if std::rc::Rc::ptr_eq(a, b))
}

/// Invokes every listener registered for `event.type`, in the order they
/// were registered, after setting `event.target`. Listener removal during
/// dispatch never affects the current pass because the list is cloned
/// before the first listener runs.
///
/// Returns a `ScriptError` directly (rather than the ambient `RuntimeError`)
/// because this is also the body of the script-visible `dispatchEvent`
/// native function, which must produce the interpreter contract's own error
/// type; [`dispatch_event_at`] is the host-side wrapper that lifts it.
fn dispatch_inner(
    ctx: &mut dyn Context,
    target: &Value,
    event: &Value,
) -> scriptbridge_engine::Result<()> {
    let Some(Value::String(kind)) = event.get_prop("type") else {
        return Ok(());
    };
    if event.get_prop("target").map(|t| t.is_undefined()).unwrap_or(true) {
        event.set_prop("target", target.clone());
    }
    let list = listeners_for(target, &kind);
    let snapshot: Vec<Value> = match &list {
        Value::Array(arr) => arr.borrow().clone(),
        _ => Vec::new(),
    };
    for listener in snapshot {
        listener.call(ctx, target, &[event.clone()])?;
    }
    Ok(())
}

/// Host-side helper: looks up `dispatchEvent` on `target` and invokes it,
/// filling in `event.target` if unset, translating any script error into
/// the ambient error type.
pub fn dispatch_event_at(ctx: &mut dyn Context, target: &Value, event: &Value) -> Result<()> {
    dispatch_inner(ctx, target, event).map_err(script_err)
}

/// Installs the script-visible `Event`, `ErrorEvent`, and `EventTarget`
/// constructors on the context's global object.
///
/// `DedicatedWorkerGlobalScope` calls this itself to pick up the same three
/// constructors rather than relying on the parent's global, since the
/// worker subsystem replaces the global wholesale.
pub fn register_event_target(ctx: &dyn Context) {
    let global = ctx.global();
    global.set_prop(
        "Event",
        Value::function("Event", 2, |ctx, _this, args| {
            let kind = args.first().map(Value::to_display_string).unwrap_or_default();
            let init = args.get(1);
            Ok(new_event(ctx, kind, init))
        }),
    );
    global.set_prop(
        "ErrorEvent",
        Value::function("ErrorEvent", 1, |ctx, _this, args| {
            let message = args.first().map(Value::to_display_string).unwrap_or_default();
            Ok(new_error_event(ctx, message))
        }),
    );
    global.set_prop(
        "EventTarget",
        Value::function("EventTarget", 0, |ctx, _this, _args| Ok(new_event_target(ctx))),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use scriptbridge_engine::RefContext;

    use super::*;

    #[test]
    fn listener_fires_once_per_dispatch() {
        let mut ctx = RefContext::new();
        let target = new_event_target(&ctx);
        let calls = Arc::new(AtomicUsize::new(0));

        let add_listener = target.get_prop("addEventListener").unwrap();
        let callback = {
            let calls = Arc::clone(&calls);
            Value::function("on-ping", 1, move |_ctx, _this, _args| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Undefined)
            })
        };
        add_listener
            .call(&mut ctx, &target, &[Value::string("ping"), callback])
            .unwrap();

        let event = new_event(&ctx, "ping", None);
        dispatch_event_at(&mut ctx, &target, &event).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(event.get_prop("target").unwrap().to_display_string(), "[object Object]");
    }

    #[test]
    fn removed_listener_is_not_invoked_on_next_dispatch() {
        let mut ctx = RefContext::new();
        let target = new_event_target(&ctx);
        let calls = Arc::new(AtomicUsize::new(0));

        let add_listener = target.get_prop("addEventListener").unwrap();
        let remove_listener = target.get_prop("removeEventListener").unwrap();
        let callback = {
            let calls = Arc::clone(&calls);
            Value::function("on-ping", 1, move |_ctx, _this, _args| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Undefined)
            })
        };
        add_listener
            .call(&mut ctx, &target, &[Value::string("ping"), callback.clone()])
            .unwrap();
        remove_listener
            .call(&mut ctx, &target, &[Value::string("ping"), callback])
            .unwrap();

        let event = new_event(&ctx, "ping", None);
        dispatch_event_at(&mut ctx, &target, &event).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_event_carries_a_message() {
        let ctx = RefContext::new();
        let event = new_error_event(&ctx, "boom");
        assert_eq!(event.get_prop("type").unwrap().to_display_string(), "error");
        assert_eq!(event.get_prop("message").unwrap().to_display_string(), "boom");
    }

    #[test]
    fn registered_constructors_build_equivalent_instances() {
        let mut ctx = RefContext::new();
        register_event_target(&ctx);
        let global = ctx.global();

        let event_ctor = global.get_prop("Event").unwrap();
        let event = event_ctor.call(&mut ctx, &Value::Undefined, &[Value::string("ping")]).unwrap();
        assert_eq!(event.get_prop("type").unwrap().to_display_string(), "ping");

        let target_ctor = global.get_prop("EventTarget").unwrap();
        let target = target_ctor.call(&mut ctx, &Value::Undefined, &[]).unwrap();
        assert!(target.get_prop("addEventListener").unwrap().is_callable());
    }
}
