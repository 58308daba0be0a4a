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

//! The single-threaded cooperative event loop.
//!
//! An `EventLoop` is split into a `Send + Sync` [`EventLoopHandle`] (the
//! queue, the wake signal, the termination flag, the task pool) that other
//! threads hold to post work, and the loop itself, which owns the
//! interpreter context and is driven by exactly one thread via `run`. This
//! is what lets a worker's parent hand messages to the child loop while the
//! child loop runs on its own dedicated thread.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use scriptbridge_engine::Context;
use tracing::{error, trace, warn};

use crate::{
    config::EventLoopConfig,
    error::{InvariantSnafu, Result, ScriptSnafu},
    event::Event,
    loop_runner::{ExceptionDisposition, LoopRunner},
    metrics::{EVENTS_APPLIED, EVENTS_FAILED, LOOP_IDLE_SECONDS, LOOP_TICKS},
    task::{Task, ThreadPool},
};

/// A save/restore guard for the interpreter's value stack.
///
/// The reference engine (`scriptbridge-engine`) has no literal operand
/// stack; its `Context` exposes typed property access instead of
/// push/pop, so this guard's restore is a no-op for it. The type exists so
/// a future `Context` implementation backed by a real stack-based
/// interpreter has somewhere to plug in the same RAII discipline the source
/// uses: every stack pushed while applying or releasing an event is unwound
/// on every exit path, including an early return from an error.
struct StackGuard;

impl StackGuard {
    fn enter(_ctx: &mut dyn Context) -> Self { StackGuard }
}

/// Wakes a sleeping loop: notify-or-terminate, paired with a deadline-aware
/// wait. Plain `Mutex<bool>` + `Condvar`.
#[derive(Default)]
struct Signal {
    mutex: Mutex<bool>,
    cv: Condvar,
}

impl Signal {
    fn notify(&self) {
        let mut woken = self.mutex.lock().expect("signal mutex poisoned");
        *woken = true;
        self.cv.notify_one();
    }

    /// Blocks until notified or `deadline` passes, whichever comes first.
    fn wait_until(&self, deadline: Instant) {
        let mut woken = self.mutex.lock().expect("signal mutex poisoned");
        loop {
            if std::mem::take(&mut *woken) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            let (guard, result) = self
                .cv
                .wait_timeout(woken, deadline - now)
                .expect("signal mutex poisoned");
            woken = guard;
            if result.timed_out() {
                return;
            }
        }
    }
}

/// The `Send + Sync` half of an [`EventLoop`]: everything another thread is
/// allowed to touch.
pub struct EventLoopHandle {
    queue: Mutex<VecDeque<Box<dyn Event>>>,
    signal: Signal,
    terminated: AtomicBool,
    tasks: Mutex<ThreadPool>,
}

impl EventLoopHandle {
    /// Enqueues at the tail. Safe from any thread; wakes the loop.
    pub fn post_event(&self, event: Box<dyn Event>) {
        self.queue
            .lock()
            .expect("event queue mutex poisoned")
            .push_back(event);
        self.signal.notify();
    }

    /// Hands work to the task pool. Safe from any thread.
    pub fn post_task(&self, task: Box<dyn Task>) {
        self.tasks.lock().expect("task pool mutex poisoned").post(task);
    }

    /// Replaces the task pool with a freshly sized one. Already-posted tasks
    /// run to completion on the old pool before it joins; tasks posted after
    /// this call returns land on the new one. Safe from any thread.
    pub fn set_task_thread_count(&self, count: usize) {
        self.tasks.lock().expect("task pool mutex poisoned").resize(count);
    }

    /// Unblocks a sleeping loop immediately without enqueuing anything.
    pub fn notify_changed(&self) { self.signal.notify(); }

    /// Sets the termination flag. Safe from any thread; the next tick
    /// boundary observes it and exits.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
        self.signal.notify();
    }

    pub fn is_terminated(&self) -> bool { self.terminated.load(Ordering::Acquire) }
}

/// Owns one interpreter context; drains an ordered event queue; invokes
/// loop-runners each tick; sleeps until the next deadline; catches and
/// forwards script errors.
pub struct EventLoop {
    handle: Arc<EventLoopHandle>,
    ctx: Box<dyn Context>,
    loop_runners: Vec<(u32, Box<dyn LoopRunner>)>,
    idle_timeout: Duration,
    on_exception: Box<dyn Fn(&crate::error::RuntimeError) -> ExceptionDisposition>,
}

impl EventLoop {
    pub fn new(ctx: Box<dyn Context>, config: EventLoopConfig) -> Self {
        EventLoop {
            handle: Arc::new(EventLoopHandle {
                queue: Mutex::new(VecDeque::new()),
                signal: Signal::default(),
                terminated: AtomicBool::new(false),
                tasks: Mutex::new(ThreadPool::new(config.task_threads)),
            }),
            ctx,
            loop_runners: Vec::new(),
            idle_timeout: config.idle_timeout,
            on_exception: Box::new(|_| ExceptionDisposition::Rethrow),
        }
    }

    /// A cloneable, `Send + Sync` handle for posting events/tasks and
    /// terminating this loop from another thread.
    pub fn handle(&self) -> Arc<EventLoopHandle> { Arc::clone(&self.handle) }

    /// Overrides the default `Rethrow` exception hook.
    pub fn set_exception_hook(
        &mut self,
        hook: impl Fn(&crate::error::RuntimeError) -> ExceptionDisposition + 'static,
    ) {
        self.on_exception = Box::new(hook);
    }

    pub fn context(&self) -> &dyn Context { self.ctx.as_ref() }

    pub fn context_mut(&mut self) -> &mut dyn Context { self.ctx.as_mut() }

    /// Consumes the loop and returns its context. Used by the worker
    /// subsystem to hand the context to its backend's `destroy_context`
    /// hook once the loop has stopped running, keeping "delete the loop"
    /// and "destroy the context" as two explicit, ordered steps even though
    /// Rust's drop glue would otherwise do both implicitly.
    pub fn into_context(self) -> Box<dyn Context> { self.ctx }

    /// Registers a hook invoked once per tick, kept sorted by ascending
    /// priority (lower runs earlier); ties are broken by insertion order,
    /// which a stable sort preserves.
    pub fn add_loop_runner(&mut self, priority: u32, runner: Box<dyn LoopRunner>) {
        self.loop_runners.push((priority, runner));
        self.loop_runners.sort_by_key(|(priority, _)| *priority);
    }

    pub fn post_event(&self, event: Box<dyn Event>) { self.handle.post_event(event); }

    pub fn post_task(&self, task: Box<dyn Task>) { self.handle.post_task(task); }

    /// Resizes the task pool backing `post_task`. Can be called before or
    /// after `run` starts, from this loop or from any `EventLoopHandle`.
    pub fn set_task_thread_count(&self, count: usize) { self.handle.set_task_thread_count(count); }

    pub fn notify_changed(&self) { self.handle.notify_changed(); }

    pub fn terminate(&self) { self.handle.terminate(); }

    pub fn is_terminated(&self) -> bool { self.handle.is_terminated() }

    /// Blocks the calling thread until `terminate()` is observed.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.handle.is_terminated() {
                self.drain_on_terminate();
                return Ok(());
            }

            let deadline = self.run_once()?;

            LOOP_TICKS.inc();
            if self.handle.is_terminated() {
                self.drain_on_terminate();
                return Ok(());
            }
            let idle_start = Instant::now();
            if idle_start < deadline {
                self.handle.signal.wait_until(deadline);
            }
            LOOP_IDLE_SECONDS.observe(idle_start.elapsed().as_secs_f64());
        }
    }

    /// Runs the loop-runners once and drains the event queue to empty,
    /// without sleeping. Returns the deadline the loop-runners would like to
    /// be driven again by. Exposed so callers (and tests) can pump the loop
    /// deterministically on the calling thread instead of blocking in `run`.
    pub fn run_once(&mut self) -> Result<Instant> {
        let now = Instant::now();
        let mut deadline = now + self.idle_timeout;
        for (_, runner) in &mut self.loop_runners {
            match runner.tick(self.ctx.as_mut(), now) {
                Ok(Some(next)) if next < deadline => deadline = next,
                Ok(_) => {}
                Err(err) => self.offer_to_exception_hook(err)?,
            }
        }

        loop {
            let event = {
                let mut queue = self.handle.queue.lock().expect("event queue mutex poisoned");
                queue.pop_front()
            };
            let Some(event) = event else { break };
            self.run_one(event.as_ref())?;
        }
        Ok(deadline)
    }

    fn run_one(&mut self, event: &dyn Event) -> Result<()> {
        trace!("applying event");
        let guard = StackGuard::enter(self.ctx.as_mut());
        match event.apply(self.ctx.as_mut()) {
            Ok(()) => EVENTS_APPLIED.inc(),
            Err(err) => {
                EVENTS_FAILED.inc();
                self.offer_to_exception_hook(err)?;
            }
        }
        drop(guard);

        let guard = StackGuard::enter(self.ctx.as_mut());
        if let Err(err) = event.release(self.ctx.as_mut()) {
            EVENTS_FAILED.inc();
            self.offer_to_exception_hook(err)?;
        }
        drop(guard);
        Ok(())
    }

    fn offer_to_exception_hook(&self, err: crate::error::RuntimeError) -> Result<()> {
        match (self.on_exception)(&err) {
            ExceptionDisposition::Rethrow => Err(err),
            ExceptionDisposition::Handled => {
                warn!(error = %err, "event loop exception handled, continuing");
                Ok(())
            }
            ExceptionDisposition::HandledWith(replacement) => {
                warn!(error = %replacement, "event loop exception handled with replacement");
                Ok(())
            }
        }
    }

    /// Clears the event queue, releasing references in the process, without
    /// applying any of the remaining events.
    fn drain_on_terminate(&mut self) {
        let remaining: Vec<Box<dyn Event>> = {
            let mut queue = self.handle.queue.lock().expect("event queue mutex poisoned");
            queue.drain(..).collect()
        };
        for event in remaining {
            if let Err(err) = event.release(self.ctx.as_mut()) {
                error!(error = %err, "error releasing event during loop termination");
            }
        }
    }

    /// Raises an `InvariantError` for embedder misuse, e.g. registering the
    /// timer handler before the event-target handler.
    pub fn invariant(message: impl Into<String>) -> Result<()> {
        InvariantSnafu {
            message: message.into(),
        }
        .fail()
    }
}

/// Wraps a [`scriptbridge_engine::ScriptError`] as a [`crate::error::RuntimeError`].
pub fn script_err(source: scriptbridge_engine::ScriptError) -> crate::error::RuntimeError {
    use snafu::IntoError;
    ScriptSnafu.into_error(source)
}
