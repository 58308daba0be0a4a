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

//! End-to-end worker scenarios: a roundtrip message exchange (S4), a
//! synchronous load-time failure surfacing as an `error` event (S5), and the
//! teardown-ordering invariant (child thread observed terminated before its
//! context is destroyed).

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use scriptbridge_engine::{Context, RefContext, Value};
use scriptbridge_runtime::{EventLoop, EventLoopConfig, register_event_target};
use scriptbridge_worker::{WorkerBackend, WorkerConfig, register_worker};

fn pump_until(loop_: &mut EventLoop, budget: Duration, mut done: impl FnMut() -> bool) {
    let start = Instant::now();
    while !done() && start.elapsed() < budget {
        loop_.run_once().unwrap();
        thread::sleep(Duration::from_millis(5));
    }
}

/// A worker script stand-in: wires the child global's `onmessage` to echo
/// `"hi"` back to the parent whenever it receives `"hello"`.
struct EchoBackend;

impl WorkerBackend for EchoBackend {
    fn create_context(&self) -> Box<dyn Context> { Box::new(RefContext::new()) }

    fn load_url(
        &self,
        ctx: &mut dyn Context,
        _loop_: &mut EventLoop,
        _url: &str,
    ) -> scriptbridge_worker::Result<()> {
        let global = ctx.global();
        global.set_prop(
            "onmessage",
            Value::function("onmessage", 1, |ctx, this, args| {
                let event = args.first().cloned().unwrap_or(Value::Undefined);
                let data = event.get_prop("data").map(|v| v.to_display_string()).unwrap_or_default();
                if data == "hello" {
                    let post_message = this.get_prop("postMessage").unwrap();
                    post_message.call(ctx, this, &[Value::string("hi")])?;
                }
                Ok(Value::Undefined)
            }),
        );
        Ok(())
    }
}

#[test]
fn worker_roundtrip_delivers_exactly_one_reply() {
    let mut parent_loop = EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build());
    register_event_target(parent_loop.context());
    let worker_handler = register_worker(&mut parent_loop, WorkerConfig::builder().build()).unwrap();
    worker_handler.set_worker(Arc::new(EchoBackend));

    let global = parent_loop.context().global();
    let worker_ctor = global.get_prop("Worker").unwrap();
    let worker = worker_ctor
        .call(parent_loop.context_mut(), &Value::Undefined, &[Value::string("echo-worker")])
        .unwrap();

    let received = Arc::new(Mutex::new(Vec::<String>::new()));
    let received_for_listener = Arc::clone(&received);
    let listener = Value::function("on-message", 1, move |_ctx, _this, args| {
        let event = args.first().cloned().unwrap_or(Value::Undefined);
        let data = event.get_prop("data").map(|v| v.to_display_string()).unwrap_or_default();
        received_for_listener.lock().unwrap().push(data);
        Ok(Value::Undefined)
    });
    worker
        .get_prop("addEventListener")
        .unwrap()
        .call(parent_loop.context_mut(), &worker, &[Value::string("message"), listener])
        .unwrap();

    worker
        .get_prop("postMessage")
        .unwrap()
        .call(parent_loop.context_mut(), &worker, &[Value::string("hello")])
        .unwrap();

    pump_until(&mut parent_loop, Duration::from_secs(2), || !received.lock().unwrap().is_empty());

    let replies = received.lock().unwrap();
    assert_eq!(replies.as_slice(), ["hi"]);
}

#[test]
fn worker_load_failure_surfaces_as_an_error_event() {
    let mut parent_loop = EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build());
    register_event_target(parent_loop.context());
    register_worker(&mut parent_loop, WorkerConfig::builder().build()).unwrap();

    let global = parent_loop.context().global();
    let worker_ctor = global.get_prop("Worker").unwrap();
    let worker = worker_ctor
        .call(parent_loop.context_mut(), &Value::Undefined, &[Value::string("throw \"kaboom\"")])
        .unwrap();

    let error_message = Arc::new(Mutex::new(None::<String>));
    let error_message_for_listener = Arc::clone(&error_message);
    let listener = Value::function("on-error", 1, move |_ctx, _this, args| {
        let event = args.first().cloned().unwrap_or(Value::Undefined);
        let message = event.get_prop("message").map(|v| v.to_display_string()).unwrap_or_default();
        *error_message_for_listener.lock().unwrap() = Some(message);
        Ok(Value::Undefined)
    });
    worker
        .get_prop("addEventListener")
        .unwrap()
        .call(parent_loop.context_mut(), &worker, &[Value::string("error"), listener])
        .unwrap();

    pump_until(&mut parent_loop, Duration::from_secs(2), || error_message.lock().unwrap().is_some());

    assert!(error_message.lock().unwrap().as_deref().unwrap().contains("kaboom"));
}

#[test]
fn terminating_a_worker_never_observes_the_child_context_outlive_its_thread() {
    struct FlaggingBackend {
        destroyed: Arc<AtomicBool>,
    }

    impl WorkerBackend for FlaggingBackend {
        fn create_context(&self) -> Box<dyn Context> { Box::new(RefContext::new()) }

        fn load_url(
            &self,
            _ctx: &mut dyn Context,
            _loop_: &mut EventLoop,
            _url: &str,
        ) -> scriptbridge_worker::Result<()> {
            Ok(())
        }

        fn destroy_context(&self, _ctx: Box<dyn Context>) { self.destroyed.store(true, Ordering::SeqCst); }
    }

    let mut parent_loop = EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build());
    register_event_target(parent_loop.context());
    let worker_handler = register_worker(&mut parent_loop, WorkerConfig::builder().build()).unwrap();
    let destroyed = Arc::new(AtomicBool::new(false));
    worker_handler.set_worker(Arc::new(FlaggingBackend {
        destroyed: Arc::clone(&destroyed),
    }));

    let global = parent_loop.context().global();
    let worker_ctor = global.get_prop("Worker").unwrap();
    let worker = worker_ctor
        .call(parent_loop.context_mut(), &Value::Undefined, &[Value::string("undefined")])
        .unwrap();

    // Give the child thread a moment to actually start running before we
    // terminate it, so this isn't just testing a worker that never got off
    // the ground.
    thread::sleep(Duration::from_millis(20));

    // `terminate()` drops this worker's table entry synchronously, which
    // runs `WorkerData`'s `Drop` (signal the child, join its thread) before
    // returning, so the child's context is already destroyed by the time
    // this call comes back.
    worker.get_prop("terminate").unwrap().call(parent_loop.context_mut(), &worker, &[]).unwrap();

    assert!(destroyed.load(Ordering::SeqCst));
}
