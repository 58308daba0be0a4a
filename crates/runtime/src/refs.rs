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

//! The Stable Reference Table: numeric IDs for interpreter values so
//! host-side objects with long lifetimes can fetch them back on demand.
//!
//! Built directly on [`scriptbridge_engine::Stash`]: the table *is* a stash
//! slot owned by the event loop's context plus the integer free-list that
//! the slot allocator already maintains. Because `Value` holds an `Rc`, the
//! table is neither `Send` nor `Sync`: it is only safe to touch from the
//! loop thread that owns the underlying context, and there is no public
//! constructor reachable from another thread.

use derive_more::{Debug, Display};
use scriptbridge_engine::{SlotStash, Stash, StashSlot, Value};

/// A positive integer handle to a rooted interpreter value. `0`/`None` is
/// reserved by callers to mean "no reference."
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
#[debug("RefId({_0})")]
#[display("{_0}")]
pub struct RefId(u32);

/// Assigns numeric IDs to interpreter values.
#[derive(Default)]
pub struct RefTable {
    stash: SlotStash,
}

impl RefTable {
    pub fn new() -> Self { Self::default() }

    /// Takes ownership of `value` and returns an ID that can later `push` it
    /// back. The idiomatic-Rust equivalent of "expects the value at the top
    /// of the stack and consumes it".
    pub fn create(&mut self, value: Value) -> RefId {
        let slot = self.stash.insert(value);
        RefId(slot.get())
    }

    /// Returns the stored value's handle, the idiomatic equivalent of
    /// "pushes the stored value back to the top".
    pub fn push(&self, id: RefId) -> Option<Value> {
        Self::slot(id).and_then(|slot| self.stash.get(slot))
    }

    /// Drops the binding and returns the ID to the free list.
    pub fn release(&mut self, id: RefId) -> Option<Value> {
        Self::slot(id).and_then(|slot| self.stash.remove(slot))
    }

    fn slot(id: RefId) -> Option<StashSlot> { StashSlot::from_raw(id.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_push_release_round_trips() {
        let mut table = RefTable::new();
        let id = table.create(Value::Number(7.0));
        assert_eq!(table.push(id).unwrap().to_display_string(), "7");
        let released = table.release(id);
        assert!(released.is_some());
        assert!(table.push(id).is_none());
    }

    #[test]
    fn released_ids_are_reused() {
        let mut table = RefTable::new();
        let a = table.create(Value::Bool(true));
        table.release(a);
        let b = table.create(Value::Bool(false));
        assert_eq!(a, b);
    }
}
