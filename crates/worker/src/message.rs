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

//! Cross-loop events: serialized payloads posted between a worker's parent
//! and child loop, never a `Value` directly (the reference engine's `Value`
//! is `Rc`-based and therefore `!Send`; see `scriptbridge_runtime::Event`).

use scriptbridge_engine::{Context, Stash, StashSlot, Value};
use scriptbridge_runtime::{Event, Result, dispatch_event_at, new_error_event, new_event, script_err};

use crate::metrics::WORKER_ERRORS;

/// Invokes the registered `addEventListener` listeners for `event.type` at
/// `target`, then, if `target.on<type>` is a callable property, invokes
/// that too. This is the worker subsystem's `onmessage`/`onerror`
/// property-sugar: since the reference engine has no property-setter
/// interception, assigning `self.onmessage = fn` is just an ordinary
/// property write, and delivery checks for it directly rather than routing
/// the assignment through `addEventListener`.
fn dispatch_with_on_x_handler(ctx: &mut dyn Context, target: &Value, event: &Value) -> Result<()> {
    dispatch_event_at(ctx, target, event)?;
    let kind = event.get_prop("type").map(|v| v.to_display_string()).unwrap_or_default();
    if let Some(handler) = target.get_prop(&format!("on{kind}")).filter(Value::is_callable) {
        handler.call(ctx, target, &[event.clone()]).map_err(script_err)?;
    }
    Ok(())
}

/// Child → parent: delivered by the child's global `postMessage`, applied on
/// the parent loop. Dispatches a `message` event at the parent-side `Worker`
/// instance, rooted in the parent's stash at `target`.
pub struct PostMessageEvent {
    pub data: String,
    pub target: StashSlot,
}

impl Event for PostMessageEvent {
    fn apply(&self, ctx: &mut dyn Context) -> Result<()> {
        let Some(worker) = ctx.stash().get(self.target) else {
            return Ok(());
        };
        let data = ctx.decode(&self.data, "jx").map_err(script_err)?;
        let init = ctx.new_object();
        init.set_prop("data", data);
        let event = new_event(ctx, "message", Some(&init));
        dispatch_with_on_x_handler(ctx, &worker, &event)
    }

    fn release(&self, _ctx: &mut dyn Context) -> Result<()> { Ok(()) }
}

/// Parent → child: delivered by the parent-side `Worker.postMessage`,
/// applied on the child loop. Dispatches a `message` event at the child's
/// own global (the `DedicatedWorkerGlobalScope`).
pub struct WorkerPostMessageEvent {
    pub data: String,
}

impl Event for WorkerPostMessageEvent {
    fn apply(&self, ctx: &mut dyn Context) -> Result<()> {
        let data = ctx.decode(&self.data, "jx").map_err(script_err)?;
        let init = ctx.new_object();
        init.set_prop("data", data);
        let global = ctx.global();
        let event = new_event(ctx, "message", Some(&init));
        dispatch_with_on_x_handler(ctx, &global, &event)
    }

    fn release(&self, _ctx: &mut dyn Context) -> Result<()> { Ok(()) }
}

/// Child error → parent: posted by a worker's exception hook, applied on the
/// parent loop. Dispatches an `ErrorEvent` at the parent-side `Worker`
/// instance.
pub struct ErrorPropagationEvent {
    pub message: String,
    pub target: StashSlot,
}

impl Event for ErrorPropagationEvent {
    fn apply(&self, ctx: &mut dyn Context) -> Result<()> {
        let Some(worker) = ctx.stash().get(self.target) else {
            return Ok(());
        };
        WORKER_ERRORS.inc();
        let event = new_error_event(ctx, self.message.clone());
        dispatch_with_on_x_handler(ctx, &worker, &event)
    }

    fn release(&self, _ctx: &mut dyn Context) -> Result<()> { Ok(()) }
}
