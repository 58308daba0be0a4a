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

//! Dedicated-worker isolates layered on `scriptbridge-runtime`'s event loop:
//! each `Worker` gets its own `EventLoop`, its own interpreter context, and
//! its own OS thread, talking to its parent loop only through serialized
//! `postMessage` payloads.

mod backend;
mod config;
mod data;
mod error;
mod global_scope;
mod handle;
mod id;
mod message;
mod metrics;

pub use backend::{ReferenceBackend, WorkerBackend, WorkerHandler};
pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use handle::register_worker;
pub use id::WorkerId;
