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

//! Per-tick hooks and the loop's fault-handling sum type.

use std::time::Instant;

use scriptbridge_engine::Context;

use crate::error::Result;

/// A hook invoked once per loop tick with the context. May post events and
/// returns an optional deadline at which it wishes to be driven again.
///
/// Loop-runners are stored in ascending-priority order (lower integer = runs
/// earlier) and are touched only from the loop thread, so the trait carries
/// no `Send`/`Sync` bound.
pub trait LoopRunner {
    fn tick(&mut self, ctx: &mut dyn Context, now: Instant) -> Result<Option<Instant>>;
}

/// The loop's fault-handling disposition, modeled as a sum type rather than a
/// boolean so there is no need for a separate subclass-override mechanism.
pub enum ExceptionDisposition {
    /// Unwind `run()`. The event queue is not cleared.
    Rethrow,
    /// Continue with the next event, discarding the error.
    Handled,
    /// Continue with the next event, logging `replacement` in place of the
    /// original error message.
    HandledWith(String),
}
