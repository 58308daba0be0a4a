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

//! Interpreter contract and reference engine.
//!
//! Defines the stack/value/property/pcall/heap-stash/codec operations the
//! runtime requires of an embedded interpreter ([`Context`], [`Value`],
//! [`NativeFunction`], [`Stash`]), and ships one reference implementation
//! ([`RefContext`]) sufficient to host and test `scriptbridge-runtime`. Not a
//! general-purpose scripting language.

mod builtins;
mod codec;
mod context;
mod error;
mod stash;
mod value;

pub use context::{Context, NativeFunction, RefContext};
pub use error::{Result, ScriptError};
pub use stash::{SlotStash, Stash, StashSlot};
pub use value::{FunctionData, PropertyMap, Value};
