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

//! The asynchronous runtime layered over `scriptbridge-engine`'s synchronous
//! interpreter contract: a single-threaded cooperative event loop, timers,
//! a console sink, and an event-target dispatch layer. The worker subsystem
//! (dedicated isolates on their own loop thread) lives in
//! `scriptbridge-worker`, one layer up, since it depends on this crate.

mod config;
mod console;
mod error;
mod event;
mod event_loop;
mod eventtarget;
mod loop_runner;
mod metrics;
mod refs;
mod task;
mod timer;

pub use config::{EventLoopConfig, TimerConfig};
pub use console::{ConsoleHandler, ConsoleLevel, ConsoleWorker, register_console};
pub use error::{Result, RuntimeError};
pub use event::{ClosureEvent, Event};
pub use event_loop::{EventLoop, EventLoopHandle, script_err};
pub use eventtarget::{
    dispatch_event_at, new_error_event, new_event, new_event_target, register_event_target,
};
pub use loop_runner::{ExceptionDisposition, LoopRunner};
pub use refs::{RefId, RefTable};
pub use task::{Task, ThreadPool};
pub use timer::{TimerHandle, register_set_timeout};
