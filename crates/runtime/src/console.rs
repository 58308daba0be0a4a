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

//! `console.log/debug/info/warn/error/clear`, bridged to `tracing` rather
//! than `println!` so a host always controls where output actually goes.

use std::sync::{Arc, Mutex};

use scriptbridge_engine::{Context, Value};
use tracing::{debug, error, info, trace, warn};

/// The severity a `console` call was made at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    Warn,
    Error,
}

/// Receives console output. The default implementation forwards to
/// `tracing`; embedders that want a different sink (e.g. to surface script
/// output in a UI panel) install their own via [`ConsoleHandler::set_worker`].
pub trait ConsoleWorker: Send {
    fn output(&self, level: ConsoleLevel, text: &str);

    fn clear(&self) {}
}

struct TracingWorker;

impl ConsoleWorker for TracingWorker {
    fn output(&self, level: ConsoleLevel, text: &str) {
        match level {
            ConsoleLevel::Log => trace!(target: "console", "{text}"),
            ConsoleLevel::Debug => debug!(target: "console", "{text}"),
            ConsoleLevel::Info => info!(target: "console", "{text}"),
            ConsoleLevel::Warn => warn!(target: "console", "{text}"),
            ConsoleLevel::Error => error!(target: "console", "{text}"),
        }
    }
}

/// A handle returned by [`register_console`], letting the embedder swap the
/// output sink at any time via [`ConsoleHandler::set_worker`].
#[derive(Clone)]
pub struct ConsoleHandler {
    worker: Arc<Mutex<Box<dyn ConsoleWorker>>>,
}

impl ConsoleHandler {
    fn new() -> Self {
        ConsoleHandler {
            worker: Arc::new(Mutex::new(Box::new(TracingWorker))),
        }
    }

    pub fn set_worker(&self, worker: Box<dyn ConsoleWorker>) {
        *self.worker.lock().expect("console worker mutex poisoned") = worker;
    }

    fn output(&self, level: ConsoleLevel, text: &str) {
        self.worker.lock().expect("console worker mutex poisoned").output(level, text);
    }

    fn clear(&self) { self.worker.lock().expect("console worker mutex poisoned").clear(); }
}

fn join_args(args: &[Value]) -> String {
    args.iter().map(Value::to_display_string).collect::<Vec<_>>().join(" ")
}

/// Installs `console.{log,debug,info,warn,error,clear}` on the context's
/// global object.
pub fn register_console(ctx: &dyn Context) -> ConsoleHandler {
    let handler = ConsoleHandler::new();
    let console = ctx.new_object();

    for (name, level) in [
        ("log", ConsoleLevel::Log),
        ("debug", ConsoleLevel::Debug),
        ("info", ConsoleLevel::Info),
        ("warn", ConsoleLevel::Warn),
        ("error", ConsoleLevel::Error),
    ] {
        let handler = handler.clone();
        console.set_prop(
            name,
            Value::function(name, 0, move |_ctx, _this, args| {
                handler.output(level, &join_args(args));
                Ok(Value::Undefined)
            }),
        );
    }
    {
        let handler = handler.clone();
        console.set_prop(
            "clear",
            Value::function("clear", 0, move |_ctx, _this, _args| {
                handler.clear();
                Ok(Value::Undefined)
            }),
        );
    }

    ctx.global().set_prop("console", console);
    handler
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use scriptbridge_engine::RefContext;

    use super::*;

    struct RecordingWorker {
        cleared: Arc<AtomicUsize>,
        lines: Arc<Mutex<Vec<(ConsoleLevel, String)>>>,
    }

    impl ConsoleWorker for RecordingWorker {
        fn output(&self, level: ConsoleLevel, text: &str) {
            self.lines.lock().unwrap().push((level, text.to_string()));
        }

        fn clear(&self) { self.cleared.fetch_add(1, Ordering::SeqCst); }
    }

    #[test]
    fn console_log_forwards_joined_arguments_to_the_worker() {
        let ctx = RefContext::new();
        let handler = register_console(&ctx);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let cleared = Arc::new(AtomicUsize::new(0));
        handler.set_worker(Box::new(RecordingWorker {
            cleared: Arc::clone(&cleared),
            lines: Arc::clone(&lines),
        }));

        let console = ctx.global().get_prop("console").unwrap();
        let log = console.get_prop("log").unwrap();
        let mut ctx = ctx;
        log.call(&mut ctx, &Value::Undefined, &[Value::string("hello"), Value::Number(1.0)])
            .unwrap();

        assert_eq!(lines.lock().unwrap().as_slice(), &[(ConsoleLevel::Log, "hello 1".to_string())]);

        let clear = console.get_prop("clear").unwrap();
        clear.call(&mut ctx, &Value::Undefined, &[]).unwrap();
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }
}
