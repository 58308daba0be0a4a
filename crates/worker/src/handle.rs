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

//! The parent-side `Worker(url)` constructor and the table that keeps each
//! spawned child's [`WorkerData`] alive until `.terminate()` is called from
//! script or the table itself is dropped.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use scriptbridge_engine::{Context, Stash, Value};
use scriptbridge_runtime::{EventLoop, EventLoopHandle, new_event_target};

use crate::{
    backend::WorkerHandler,
    config::WorkerConfig,
    data::WorkerData,
    error::{InvariantSnafu, Result},
    id::WorkerId,
    message::WorkerPostMessageEvent,
    metrics::WORKER_MESSAGES_SENT,
};

/// Keeps every live worker's [`WorkerData`] alive. Removing an entry runs
/// `WorkerData`'s `Drop`, which terminates and joins that worker's thread.
#[derive(Clone, Default)]
struct WorkerTable(Arc<Mutex<HashMap<WorkerId, WorkerData>>>);

impl WorkerTable {
    fn insert(&self, data: WorkerData) {
        let id = data.id();
        self.0.lock().expect("worker table mutex poisoned").insert(id, data);
    }

    /// Drops the entry for `id`, if present, tearing that worker down.
    fn terminate(&self, id: WorkerId) {
        self.0.lock().expect("worker table mutex poisoned").remove(&id);
    }
}

/// Installs the `Worker(url)` constructor on `loop_`'s global and returns the
/// [`WorkerHandler`] an embedder uses to swap in a real
/// [`crate::backend::WorkerBackend`] in place of the zero-config default.
///
/// Requires `EventTarget` already be registered on the parent's global (see
/// `scriptbridge_runtime::register_event_target`): a worker's `message` and
/// `error` events are delivered through the same `addEventListener`/
/// `dispatchEvent` machinery a host-level `EventTarget` would use, and this
/// keeps that assumption checkable at construction time instead of failing
/// silently the first time a worker tries to dispatch.
pub fn register_worker(loop_: &mut EventLoop, config: WorkerConfig) -> Result<WorkerHandler> {
    let global = loop_.context().global();
    if !global.get_prop("EventTarget").map(|v| v.is_callable()).unwrap_or(false) {
        return InvariantSnafu {
            message: "EventTarget must be registered on the parent context before constructing a Worker",
        }
        .fail();
    }

    let worker_handler = WorkerHandler::new();
    let table = WorkerTable::default();
    let parent_handle = loop_.handle();

    let ctor_handler = worker_handler.clone();
    let ctor_table = table.clone();
    global.set_prop(
        "Worker",
        Value::function("Worker", 1, move |ctx, _this, args| {
            let url = args.first().map(Value::to_display_string).unwrap_or_default();
            Ok(new_worker(ctx, &parent_handle, &config, &ctor_handler, &ctor_table, url))
        }),
    );

    Ok(worker_handler)
}

/// Spawns a worker's child thread and builds the parent-side `Worker`
/// instance: an `EventTarget` carrying `postMessage(value)` (forwards to the
/// child) and `terminate()` (drops this worker's entry in `table`).
fn new_worker(
    ctx: &mut dyn Context,
    parent_handle: &Arc<EventLoopHandle>,
    config: &WorkerConfig,
    worker_handler: &WorkerHandler,
    table: &WorkerTable,
    url: String,
) -> Value {
    let worker = new_event_target(ctx);
    let slot = ctx.stash().insert(worker.clone());

    let id = WorkerId::new();
    let data = WorkerData::spawn(id, worker_handler.current(), config.clone(), Arc::clone(parent_handle), slot, url);
    let child_handle = Arc::clone(data.child_handle());
    table.insert(data);

    worker.set_prop(
        "postMessage",
        Value::function("postMessage", 1, move |ctx, _this, args| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            let data = ctx.encode(&value, "jx")?;
            WORKER_MESSAGES_SENT.inc();
            child_handle.post_event(Box::new(WorkerPostMessageEvent { data }));
            Ok(Value::Undefined)
        }),
    );

    let term_table = table.clone();
    worker.set_prop(
        "terminate",
        Value::function("terminate", 0, move |_ctx, _this, _args| {
            term_table.terminate(id);
            Ok(Value::Undefined)
        }),
    );

    worker
}

#[cfg(test)]
mod tests {
    use scriptbridge_engine::RefContext;
    use scriptbridge_runtime::{EventLoopConfig, register_event_target};

    use super::*;

    #[test]
    fn requires_event_target_to_already_be_registered() {
        let mut loop_ = EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build());
        let err = register_worker(&mut loop_, WorkerConfig::builder().build()).unwrap_err();
        assert!(matches!(err, crate::error::WorkerError::Invariant { .. }));
    }

    #[test]
    fn worker_constructor_builds_an_event_target_instance() {
        let mut loop_ = EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build());
        register_event_target(loop_.context());
        register_worker(&mut loop_, WorkerConfig::builder().build()).unwrap();

        let global = loop_.context().global();
        let worker_ctor = global.get_prop("Worker").unwrap();
        let worker = worker_ctor
            .call(loop_.context_mut(), &Value::Undefined, &[Value::string("about:blank")])
            .unwrap();

        assert!(worker.get_prop("postMessage").unwrap().is_callable());
        assert!(worker.get_prop("terminate").unwrap().is_callable());
        assert!(worker.get_prop("addEventListener").unwrap().is_callable());

        worker.get_prop("terminate").unwrap().call(loop_.context_mut(), &worker, &[]).unwrap();
    }
}
