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

//! `setTimeout` / `setInterval` / `clearTimeout` / `clearInterval`, installed
//! as a loop-runner at a configurable (default very-high) priority.
//!
//! Timer bookkeeping (`TimerState`) holds only plain, `Send` data: deadlines,
//! ids, a `StashSlot`, never a `Value` directly, because it is shared behind
//! an `Arc<Mutex<_>>` between the native functions, the loop-runner, and the
//! posted fire events. The callback itself stays rooted in the owning
//! `Context`'s own stash and is looked up only inside code that runs on the
//! loop thread (`tick`, `TimerFireEvent::apply`).

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use scriptbridge_engine::{Context, ScriptError, Stash, StashSlot, Value};
use snafu::Location;
use tracing::debug;

use crate::{
    config::TimerConfig,
    error::Result,
    event::Event,
    event_loop::{EventLoop, EventLoopHandle, script_err},
    loop_runner::LoopRunner,
    metrics::{TIMERS_CANCELLED, TIMERS_FIRED},
};

struct TimerEntry {
    id: u32,
    deadline: Instant,
    /// `Some(period)` for `setInterval`, `None` for `setTimeout`.
    period: Option<Duration>,
    removed: bool,
    /// Set while a `TimerFireEvent` for this entry is in flight, so the
    /// loop-runner does not promote it a second time before it resolves.
    firing: bool,
    callback: StashSlot,
}

#[derive(Default)]
struct TimerState {
    entries: Vec<TimerEntry>,
    next_id: u32,
}

/// A handle to the installed timer subsystem, mostly useful for
/// introspection in tests and embedders that want to know how many timers
/// are outstanding.
pub struct TimerHandle {
    state: Arc<Mutex<TimerState>>,
}

impl TimerHandle {
    pub fn pending_count(&self) -> usize {
        self.state.lock().expect("timer state poisoned").entries.len()
    }
}

/// Installs `setTimeout`/`setInterval`/`clearTimeout`/`clearInterval` on the
/// loop's global object and registers the timer loop-runner.
pub fn register_set_timeout(loop_: &mut EventLoop, config: TimerConfig) -> TimerHandle {
    let state = Arc::new(Mutex::new(TimerState {
        entries: Vec::new(),
        next_id: 1,
    }));
    let global = loop_.context().global();

    {
        let state = Arc::clone(&state);
        global.set_prop(
            "setTimeout",
            Value::function("setTimeout", 2, move |ctx, _this, args| {
                install_timer(ctx, &state, args, false)
            }),
        );
    }
    {
        let state = Arc::clone(&state);
        global.set_prop(
            "setInterval",
            Value::function("setInterval", 2, move |ctx, _this, args| {
                install_timer(ctx, &state, args, true)
            }),
        );
    }
    {
        let state = Arc::clone(&state);
        global.set_prop(
            "clearTimeout",
            Value::function("clearTimeout", 1, move |_ctx, _this, args| cancel(&state, args)),
        );
    }
    {
        let state = Arc::clone(&state);
        global.set_prop(
            "clearInterval",
            Value::function("clearInterval", 1, move |_ctx, _this, args| cancel(&state, args)),
        );
    }

    loop_.add_loop_runner(
        config.priority,
        Box::new(TimerRunner {
            state: Arc::clone(&state),
            handle: loop_.handle(),
            config,
        }),
    );

    TimerHandle { state }
}

fn install_timer(
    ctx: &mut dyn Context,
    state: &Arc<Mutex<TimerState>>,
    args: &[Value],
    repeating: bool,
) -> scriptbridge_engine::Result<Value> {
    let callback = args.first().cloned().unwrap_or(Value::Undefined);
    if !callback.is_callable() {
        return Err(ScriptError::TypeMismatch {
            expected: "function".to_string(),
            found: "non-callable value".to_string(),
            loc: Location::new(file!(), line!(), column!()),
        });
    }
    let delay_ms = match args.get(1) {
        Some(Value::Number(n)) => n.max(0.0),
        _ => 0.0,
    };
    let period = Duration::from_millis(delay_ms as u64);
    let slot = ctx.stash().insert(callback);

    let mut state = state.lock().expect("timer state poisoned");
    let id = state.next_id;
    state.next_id += 1;
    state.entries.push(TimerEntry {
        id,
        deadline: Instant::now() + period,
        period: repeating.then_some(period),
        removed: false,
        firing: false,
        callback: slot,
    });
    Ok(Value::Number(id as f64))
}

fn cancel(state: &Arc<Mutex<TimerState>>, args: &[Value]) -> scriptbridge_engine::Result<Value> {
    let id = match args.first() {
        Some(Value::Number(n)) => *n as u32,
        _ => return Ok(Value::Bool(false)),
    };
    let mut state = state.lock().expect("timer state poisoned");
    match state.entries.iter_mut().find(|entry| entry.id == id) {
        Some(entry) if !entry.removed => {
            entry.removed = true;
            TIMERS_CANCELLED.inc();
            Ok(Value::Bool(true))
        }
        _ => Ok(Value::Bool(false)),
    }
}

struct TimerRunner {
    state: Arc<Mutex<TimerState>>,
    handle: Arc<EventLoopHandle>,
    config: TimerConfig,
}

impl LoopRunner for TimerRunner {
    fn tick(&mut self, ctx: &mut dyn Context, now: Instant) -> Result<Option<Instant>> {
        let mut state = self.state.lock().expect("timer state poisoned");
        state.entries.sort_by_key(|entry| entry.deadline);

        let mut promoted = 0;
        let mut index = 0;
        while index < state.entries.len() && promoted < self.config.max_promotions_per_tick {
            if state.entries[index].removed {
                let entry = state.entries.remove(index);
                ctx.stash().remove(entry.callback);
                promoted += 1;
                continue;
            }
            if !state.entries[index].firing && state.entries[index].deadline <= now {
                state.entries[index].firing = true;
                let id = state.entries[index].id;
                let slot = state.entries[index].callback;
                debug!(timer_id = id, "promoting timer to loop event");
                TIMERS_FIRED.inc();
                self.handle.post_event(Box::new(TimerFireEvent {
                    id,
                    slot,
                    state: Arc::clone(&self.state),
                }));
                promoted += 1;
                index += 1;
                continue;
            }
            // Sorted by deadline: nothing earlier remains.
            break;
        }

        Ok(state.entries.iter().map(|entry| entry.deadline).min())
    }
}

struct TimerFireEvent {
    id: u32,
    slot: StashSlot,
    state: Arc<Mutex<TimerState>>,
}

impl Event for TimerFireEvent {
    fn apply(&self, ctx: &mut dyn Context) -> Result<()> {
        let Some(callback) = ctx.stash().get(self.slot) else {
            return Ok(());
        };
        let this = ctx.global();
        callback.call(ctx, &this, &[]).map_err(script_err)?;

        let mut state = self.state.lock().expect("timer state poisoned");
        let Some(index) = state.entries.iter().position(|entry| entry.id == self.id) else {
            return Ok(());
        };
        let rearm = state.entries[index]
            .period
            .filter(|_| !state.entries[index].removed);
        match rearm {
            Some(period) => {
                state.entries[index].deadline = Instant::now() + period;
                state.entries[index].firing = false;
            }
            None => {
                let entry = state.entries.remove(index);
                drop(state);
                ctx.stash().remove(entry.callback);
            }
        }
        Ok(())
    }

    fn release(&self, _ctx: &mut dyn Context) -> Result<()> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use scriptbridge_engine::RefContext;

    use super::*;
    use crate::config::EventLoopConfig;

    fn new_loop() -> EventLoop {
        EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build())
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> Value {
        let counter = Arc::clone(counter);
        Value::function("cb", 0, move |_ctx, _this, _args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Undefined)
        })
    }

    #[test]
    fn one_shot_timer_fires_once() {
        let mut loop_ = new_loop();
        let handle = register_set_timeout(&mut loop_, TimerConfig::builder().build());
        let fired = Arc::new(AtomicUsize::new(0));

        let set_timeout = loop_.context().global().get_prop("setTimeout").unwrap();
        set_timeout
            .call(
                loop_.context_mut(),
                &Value::Undefined,
                &[counting_callback(&fired), Value::Number(5.0)],
            )
            .unwrap();

        std::thread::sleep(Duration::from_millis(20));
        loop_.run_once().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(handle.pending_count(), 0);

        std::thread::sleep(Duration::from_millis(20));
        loop_.run_once().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_timeout_prevents_firing_and_is_idempotent() {
        let mut loop_ = new_loop();
        register_set_timeout(&mut loop_, TimerConfig::builder().build());
        let fired = Arc::new(AtomicUsize::new(0));

        let global = loop_.context().global();
        let set_timeout = global.get_prop("setTimeout").unwrap();
        let clear_timeout = global.get_prop("clearTimeout").unwrap();

        let id = set_timeout
            .call(
                loop_.context_mut(),
                &Value::Undefined,
                &[counting_callback(&fired), Value::Number(20.0)],
            )
            .unwrap();

        let first_clear = clear_timeout
            .call(loop_.context_mut(), &Value::Undefined, &[id.clone()])
            .unwrap();
        assert!(matches!(first_clear, Value::Bool(true)));
        let second_clear = clear_timeout
            .call(loop_.context_mut(), &Value::Undefined, &[id])
            .unwrap();
        assert!(matches!(second_clear, Value::Bool(false)));

        std::thread::sleep(Duration::from_millis(30));
        loop_.run_once().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn interval_reschedules_until_cleared() {
        let mut loop_ = new_loop();
        register_set_timeout(&mut loop_, TimerConfig::builder().build());
        let fired = Arc::new(AtomicUsize::new(0));

        let global = loop_.context().global();
        let set_interval = global.get_prop("setInterval").unwrap();
        let clear_interval = global.get_prop("clearInterval").unwrap();

        let id = set_interval
            .call(
                loop_.context_mut(),
                &Value::Undefined,
                &[counting_callback(&fired), Value::Number(5.0)],
            )
            .unwrap();

        std::thread::sleep(Duration::from_millis(10));
        loop_.run_once().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        loop_.run_once().unwrap();
        assert!(fired.load(Ordering::SeqCst) >= 2);

        clear_interval
            .call(loop_.context_mut(), &Value::Undefined, &[id])
            .unwrap();
        loop_.run_once().unwrap();
        let count_after_clear = fired.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        loop_.run_once().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), count_after_clear);
    }
}
