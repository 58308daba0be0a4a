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
    pub static ref WORKERS_SPAWNED: IntCounter =
        register_int_counter!("scriptbridge_workers_spawned_total", "Workers constructed").unwrap();
    pub static ref WORKERS_TORN_DOWN: IntCounter = register_int_counter!(
        "scriptbridge_workers_torn_down_total",
        "Workers whose child loop terminated and was joined"
    )
    .unwrap();
    pub static ref WORKER_ERRORS: IntCounter = register_int_counter!(
        "scriptbridge_worker_errors_total",
        "Errors propagated from a child loop to its parent"
    )
    .unwrap();
    pub static ref WORKER_MESSAGES_SENT: IntCounter = register_int_counter!(
        "scriptbridge_worker_messages_sent_total",
        "postMessage calls made in either direction across a worker boundary"
    )
    .unwrap();
}
