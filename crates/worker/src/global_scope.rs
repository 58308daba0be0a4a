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

//! Replaces a freshly constructed child context's global with a
//! `DedicatedWorkerGlobalScope`: an `EventTarget`-capable object carrying
//! `self`, `close()`, `importScripts()`, `postMessage(value)`, and exactly
//! the four properties carried over from the context's original global
//! (`Object`, `Error`, `print`, `Codec`); everything else on the old global
//! is discarded.
//!
//! `self` points back at the scope object itself, which is a deliberate `Rc`
//! cycle: the reference engine roots values by reference count alone (see
//! `scriptbridge_engine`'s data model notes) and has no cycle collector.
//! Acceptable here because a worker's context is destroyed as a single unit
//! at teardown, not incrementally reclaimed.

use std::sync::Arc;

use scriptbridge_engine::{Context, Stash, StashSlot, Value};
use scriptbridge_runtime::{EventLoopHandle, new_event_target};

use crate::{message::PostMessageEvent, metrics::WORKER_MESSAGES_SENT};

const CARRIED_OVER_PROPERTIES: [&str; 4] = ["Object", "Error", "print", "Codec"];

/// Builds the `DedicatedWorkerGlobalScope` and installs it via
/// `ctx.set_global`. `parent_handle` is the parent loop's handle, used by
/// the installed `postMessage` to enqueue a [`PostMessageEvent`] there.
/// `parent_worker_ref` is the stash slot on the *parent's* context holding
/// the `Worker` instance `postMessage` should dispatch `message`/`error`
/// events at.
pub fn install(
    ctx: &mut dyn Context,
    parent_handle: Arc<EventLoopHandle>,
    parent_worker_ref: StashSlot,
) {
    let old_global = ctx.global();
    let scope = new_event_target(ctx);

    for name in CARRIED_OVER_PROPERTIES {
        if let Some(value) = old_global.get_prop(name) {
            scope.set_prop(name, value);
        }
    }

    scope.set_prop("self", scope.clone());
    scope.set_prop("close", Value::function("close", 0, |_ctx, _this, _args| Ok(Value::Undefined)));
    scope.set_prop(
        "importScripts",
        Value::function("importScripts", 0, |_ctx, _this, _args| Ok(Value::Undefined)),
    );

    scope.set_prop("postMessage", Value::function("postMessage", 1, move |ctx, _this, args| {
        let value = args.first().cloned().unwrap_or(Value::Undefined);
        let data = ctx.encode(&value, "jx")?;
        WORKER_MESSAGES_SENT.inc();
        parent_handle.post_event(Box::new(PostMessageEvent {
            data,
            target: parent_worker_ref,
        }));
        Ok(Value::Undefined)
    }));

    ctx.set_global(scope);
}
