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

//! The heap-stash equivalent: a root-reachable, host-addressable slot table.

use std::num::NonZeroU32;

use crate::value::Value;

/// A handle into a [`Stash`]. Never zero; the zero value is reserved by
/// callers (such as the stable reference table) to mean "no reference."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StashSlot(NonZeroU32);

impl StashSlot {
    pub fn get(self) -> u32 { self.0.get() }

    /// Reconstructs a slot handle from its raw integer value.
    ///
    /// `Stash` implementations only ever mint slots through `insert`; this
    /// is for callers such as the stable reference table that persist the
    /// integer outside the stash and need to round-trip it back into a
    /// typed handle.
    pub fn from_raw(value: u32) -> Option<Self> { NonZeroU32::new(value).map(Self) }
}

/// The rooted array that the stable reference table and the timer callback
/// array are both built on.
pub trait Stash {
    /// Roots `value`, returning a slot that keeps it alive independent of
    /// normal reachability until [`Stash::remove`] is called.
    fn insert(&mut self, value: Value) -> StashSlot;

    fn get(&self, slot: StashSlot) -> Option<Value>;

    /// Un-roots the value at `slot`, returning it if it was still present.
    fn remove(&mut self, slot: StashSlot) -> Option<Value>;
}

/// A `Vec<Option<Value>>` plus a free-id stack, the simplest implementation
/// of [`Stash`] satisfying the rooting contract.
#[derive(Default)]
pub struct SlotStash {
    slots: Vec<Option<Value>>,
    free: Vec<u32>,
}

impl SlotStash {
    pub fn new() -> Self { Self::default() }
}

impl Stash for SlotStash {
    fn insert(&mut self, value: Value) -> StashSlot {
        let index = if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(value);
            index
        } else {
            self.slots.push(Some(value));
            (self.slots.len() - 1) as u32
        };
        StashSlot(NonZeroU32::new(index + 1).expect("index + 1 is never zero"))
    }

    fn get(&self, slot: StashSlot) -> Option<Value> {
        self.slots.get((slot.get() - 1) as usize)?.clone()
    }

    fn remove(&mut self, slot: StashSlot) -> Option<Value> {
        let index = slot.get() - 1;
        let slot_ref = self.slots.get_mut(index as usize)?;
        let value = slot_ref.take();
        if value.is_some() {
            self.free.push(index);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_round_trips() {
        let mut stash = SlotStash::new();
        let slot = stash.insert(Value::Number(42.0));
        assert_eq!(stash.get(slot).unwrap().to_display_string(), "42");
        let removed = stash.remove(slot);
        assert!(removed.is_some());
        assert!(stash.get(slot).is_none());
    }

    #[test]
    fn released_slots_are_reused() {
        let mut stash = SlotStash::new();
        let a = stash.insert(Value::Bool(true));
        stash.remove(a);
        let b = stash.insert(Value::Bool(false));
        assert_eq!(a.get(), b.get());
    }
}
