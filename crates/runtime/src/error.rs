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

use scriptbridge_engine::ScriptError;
use scriptbridge_error::StackError;
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors surfaced by the event loop, timer subsystem, and event-target
/// layer. Wraps [`ScriptError`] as `source` when the fault originated inside
/// the interpreter; the `Invariant` variant covers embedder misuse such as
/// registering the timer handler before the event-target handler.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("script error while applying an event"))]
    Script {
        source: ScriptError,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("invariant violated: {message}"))]
    Invariant {
        message: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("no loop-runner slot is registered for timers"))]
    TimerHandlerNotRegistered {
        #[snafu(implicit)]
        loc: snafu::Location,
    },
}

impl StackError for RuntimeError {
    fn next(&self) -> Option<&dyn StackError> {
        match self {
            RuntimeError::Script { source, .. } => Some(source),
            RuntimeError::Invariant { .. } | RuntimeError::TimerHandlerNotRegistered { .. } => None,
        }
    }
}
