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
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, ScriptError>;

/// Error raised from inside the interpreter contract: a thrown script value,
/// a type mismatch, a failed property lookup, or a codec failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ScriptError {
    /// A value was thrown across a `call`/`eval` boundary.
    #[snafu(display("{message}"))]
    Thrown {
        message: String,
        stack: Option<String>,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("value is not callable"))]
    NotCallable {
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("property not found: {key}"))]
    PropertyNotFound {
        key: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("type error: expected {expected}, found {found}"))]
    TypeMismatch {
        expected: String,
        found: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("encode failed: {message}"))]
    Encode {
        message: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("decode failed: {message}"))]
    Decode {
        message: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("unknown codec format: {format}"))]
    UnknownFormat {
        format: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("eval error: {message}"))]
    Eval {
        message: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },
}

impl StackError for ScriptError {
    fn next(&self) -> Option<&dyn StackError> { None }
}
