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

use scriptbridge_error::StackError;
use scriptbridge_runtime::RuntimeError;
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors surfaced by worker construction, message delivery, and teardown.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WorkerError {
    #[snafu(display("runtime error inside a worker's loop"))]
    Runtime {
        source: RuntimeError,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("worker url loader failed: {message}"))]
    LoaderFailed {
        message: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("invariant violated: {message}"))]
    Invariant {
        message: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },
}

impl StackError for WorkerError {
    fn next(&self) -> Option<&dyn StackError> {
        match self {
            WorkerError::Runtime { source, .. } => Some(source),
            WorkerError::LoaderFailed { .. } | WorkerError::Invariant { .. } => None,
        }
    }
}
