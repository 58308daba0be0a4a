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

use lazy_static::lazy_static;
use prometheus::*;

lazy_static! {
    pub static ref LOOP_TICKS: IntCounter =
        register_int_counter!("scriptbridge_loop_ticks_total", "Event loop ticks run").unwrap();
    pub static ref EVENTS_APPLIED: IntCounter = register_int_counter!(
        "scriptbridge_events_applied_total",
        "Events applied by the loop"
    )
    .unwrap();
    pub static ref EVENTS_FAILED: IntCounter = register_int_counter!(
        "scriptbridge_events_failed_total",
        "Events whose apply or release raised an error"
    )
    .unwrap();
    pub static ref TASKS_POSTED: IntCounter =
        register_int_counter!("scriptbridge_tasks_posted_total", "Tasks posted to the pool")
            .unwrap();
    pub static ref TIMERS_FIRED: IntCounter =
        register_int_counter!("scriptbridge_timers_fired_total", "Timer callbacks invoked")
            .unwrap();
    pub static ref TIMERS_CANCELLED: IntCounter = register_int_counter!(
        "scriptbridge_timers_cancelled_total",
        "Timers cancelled via clearTimeout/clearInterval"
    )
    .unwrap();
    pub static ref LOOP_IDLE_SECONDS: Histogram = register_histogram!(
        "scriptbridge_loop_idle_seconds",
        "Time spent blocked on the loop's condition variable"
    )
    .unwrap();
}
