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

//! The embedder-supplied half of worker construction: where a child context
//! comes from, and how a URL becomes the script that runs in it.
//!
//! URL/script loading policy is explicitly out of scope for this crate (the
//! host owns it). [`ReferenceBackend`] is the zero-config default: it treats
//! its `url` argument as an inline expression for `Context::eval`, a
//! stand-in a real host replaces with its own script loader, the same way
//! [`scriptbridge_runtime::ConsoleWorker`]'s default implementation forwards
//! to `tracing` until an embedder swaps it.

use std::sync::{Arc, Mutex};

use scriptbridge_engine::{Context, RefContext};
use scriptbridge_runtime::{EventLoop, script_err};
use snafu::ResultExt;

use crate::error::{Result, RuntimeSnafu};

/// Supplies a child interpreter context and loads a worker's script into it.
///
/// `create_context` may be called from the newly spawned worker thread (see
/// [`crate::data::WorkerData::spawn`]); the `Context` it returns must never
/// have been touched on any other thread, since the reference engine's
/// `Value` is `Rc`-based and therefore `!Send`.
pub trait WorkerBackend: Send + Sync {
    fn create_context(&self) -> Box<dyn Context>;

    /// Invoked once, on the child's own thread, after the context's global
    /// has been replaced with a `DedicatedWorkerGlobalScope`.
    fn load_url(&self, ctx: &mut dyn Context, loop_: &mut EventLoop, url: &str) -> Result<()>;

    /// Runs just before the child context is dropped. Default is a no-op;
    /// embedders with native resources attached to a context override it.
    fn destroy_context(&self, _ctx: Box<dyn Context>) {}
}

/// The zero-config backend: a bare reference-engine context whose loader
/// evaluates `url` as an inline expression.
pub struct ReferenceBackend;

impl WorkerBackend for ReferenceBackend {
    fn create_context(&self) -> Box<dyn Context> { Box::new(RefContext::new()) }

    fn load_url(&self, ctx: &mut dyn Context, _loop_: &mut EventLoop, url: &str) -> Result<()> {
        ctx.eval(url).map(|_| ()).map_err(script_err).context(RuntimeSnafu)
    }
}

/// Swappable holder for the active [`WorkerBackend`], mirroring
/// [`scriptbridge_runtime::ConsoleHandler`]'s `set_worker` shape.
#[derive(Clone)]
pub struct WorkerHandler {
    backend: Arc<Mutex<Arc<dyn WorkerBackend>>>,
}

impl WorkerHandler {
    pub fn new() -> Self {
        WorkerHandler {
            backend: Arc::new(Mutex::new(Arc::new(ReferenceBackend) as Arc<dyn WorkerBackend>)),
        }
    }

    pub fn set_worker(&self, backend: Arc<dyn WorkerBackend>) {
        *self.backend.lock().expect("worker backend mutex poisoned") = backend;
    }

    pub(crate) fn current(&self) -> Arc<dyn WorkerBackend> {
        Arc::clone(&self.backend.lock().expect("worker backend mutex poisoned"))
    }
}

impl Default for WorkerHandler {
    fn default() -> Self { Self::new() }
}
