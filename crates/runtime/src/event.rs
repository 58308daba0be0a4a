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

//! Deferred work applied on the owning loop's thread.

use scriptbridge_engine::Context;

use crate::error::Result;

/// An opaque unit of deferred work, applied on the owning loop's thread.
///
/// Events are created on any thread and posted into a loop via
/// [`crate::EventLoop::post_event`], which is why `Event` requires `Send`.
/// Because the reference engine's `Value` is `Rc`-based and therefore not
/// `Send`, an `Event` implementation must not carry a `Value` across the
/// thread boundary directly; it carries `Send` data (a serialized string,
/// an integer ID) and constructs or looks up `Value`s only inside `apply`,
/// which always runs on the loop thread.
pub trait Event: Send {
    /// Performs the work. Runs with the interpreter stack reset to the tick's
    /// starting depth.
    fn apply(&self, ctx: &mut dyn Context) -> Result<()>;

    /// Frees any stable references this event holds. Called with the same
    /// error discipline as `apply`, immediately after it.
    fn release(&self, ctx: &mut dyn Context) -> Result<()>;
}

/// An `Event` built from two plain closures, for callers that don't need a
/// dedicated type.
pub struct ClosureEvent<A, R>
where
    A: Fn(&mut dyn Context) -> Result<()> + Send,
    R: Fn(&mut dyn Context) -> Result<()> + Send,
{
    apply: A,
    release: R,
}

impl<A, R> ClosureEvent<A, R>
where
    A: Fn(&mut dyn Context) -> Result<()> + Send,
    R: Fn(&mut dyn Context) -> Result<()> + Send,
{
    pub fn new(apply: A, release: R) -> Self { ClosureEvent { apply, release } }
}

impl<A, R> Event for ClosureEvent<A, R>
where
    A: Fn(&mut dyn Context) -> Result<()> + Send,
    R: Fn(&mut dyn Context) -> Result<()> + Send,
{
    fn apply(&self, ctx: &mut dyn Context) -> Result<()> { (self.apply)(ctx) }

    fn release(&self, ctx: &mut dyn Context) -> Result<()> { (self.release)(ctx) }
}
