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

//! Owns a worker's child thread: spawning it, handing it its
//! `DedicatedWorkerGlobalScope`, and tearing it down.
//!
//! A host might picture teardown as four steps: terminate the child, join
//! the thread, delete the loop, destroy the context. That order can't be
//! followed step for step here, since the context is `Rc`-based and can only
//! ever be built, run, and dropped on the one thread that owns it. What we
//! do instead is equivalent from the parent's point of view: `terminate()`
//! asks the child loop to stop, and the child thread itself deletes its loop
//! and destroys its context as the last thing it does before exiting. `Drop`
//! only returns once that thread has actually exited, so by the time a
//! `WorkerData` is gone its context is provably gone too.

use std::{
    sync::{Arc, mpsc},
    thread::{self, JoinHandle},
    time::Duration,
};

use scriptbridge_engine::StashSlot;
use scriptbridge_error::StackError;
use scriptbridge_runtime::{EventLoop, EventLoopHandle, ExceptionDisposition};
use tracing::{error, info, warn};

use crate::{
    backend::WorkerBackend,
    config::WorkerConfig,
    global_scope,
    id::WorkerId,
    message::ErrorPropagationEvent,
    metrics::{WORKERS_SPAWNED, WORKERS_TORN_DOWN},
};

/// The parent-side handle to a worker's child thread and loop.
pub struct WorkerData {
    id: WorkerId,
    child_handle: Arc<EventLoopHandle>,
    join_handle: Option<JoinHandle<()>>,
    shutdown_join_timeout: Duration,
}

impl WorkerData {
    /// Spawns the child thread, builds its context and loop there, installs
    /// its `DedicatedWorkerGlobalScope`, and kicks off `url`'s load. Blocks
    /// only long enough for the child thread to publish its loop handle, not
    /// for the load or the loop itself, which both run in the background.
    pub fn spawn(
        id: WorkerId,
        backend: Arc<dyn WorkerBackend>,
        config: WorkerConfig,
        parent_handle: Arc<EventLoopHandle>,
        parent_worker_ref: StashSlot,
        url: String,
    ) -> Self {
        let (ready_tx, ready_rx) = mpsc::channel::<Arc<EventLoopHandle>>();
        let loop_config = config.loop_config.clone();

        let join_handle = thread::Builder::new()
            .name(format!("scriptbridge-worker-{id}"))
            .spawn(move || {
                let ctx = backend.create_context();
                let mut loop_ = EventLoop::new(ctx, loop_config);
                global_scope::install(loop_.context_mut(), Arc::clone(&parent_handle), parent_worker_ref);

                let hook_handle = Arc::clone(&parent_handle);
                loop_.set_exception_hook(move |err| {
                    hook_handle.post_event(Box::new(ErrorPropagationEvent {
                        message: err.root_cause().to_string(),
                        target: parent_worker_ref,
                    }));
                    ExceptionDisposition::Handled
                });

                if ready_tx.send(loop_.handle()).is_err() {
                    return;
                }

                if let Err(err) = backend.load_url(loop_.context_mut(), &mut loop_, &url) {
                    warn!(worker = %id, error = %err, "worker url loader failed");
                    parent_handle.post_event(Box::new(ErrorPropagationEvent {
                        message: err.root_cause().to_string(),
                        target: parent_worker_ref,
                    }));
                }

                if let Err(err) = loop_.run() {
                    error!(worker = %id, error = %err, "worker loop exited with an error");
                }

                let ctx = loop_.into_context();
                backend.destroy_context(ctx);
                info!(worker = %id, "worker loop thread exiting");
            })
            .expect("failed to spawn worker thread");

        let child_handle = ready_rx
            .recv()
            .expect("worker thread dropped before publishing its loop handle");

        WORKERS_SPAWNED.inc();
        WorkerData {
            id,
            child_handle,
            join_handle: Some(join_handle),
            shutdown_join_timeout: config.shutdown_join_timeout,
        }
    }

    pub fn id(&self) -> WorkerId { self.id }

    pub fn child_handle(&self) -> &Arc<EventLoopHandle> { &self.child_handle }
}

impl Drop for WorkerData {
    fn drop(&mut self) {
        self.child_handle.terminate();
        if let Some(join_handle) = self.join_handle.take() {
            join_with_warning(join_handle, self.shutdown_join_timeout, self.id);
        }
        WORKERS_TORN_DOWN.inc();
    }
}

/// Waits for `handle` on a watcher thread so a slow-to-exit worker only logs
/// a warning instead of hanging `Drop` forever; the join itself is never
/// abandoned, `Drop` still blocks until the watcher reports back.
fn join_with_warning(handle: JoinHandle<()>, timeout: Duration, id: WorkerId) {
    let (tx, rx) = mpsc::channel();
    let watcher = thread::Builder::new()
        .name("scriptbridge-worker-join".to_string())
        .spawn(move || {
            let _ = handle.join();
            let _ = tx.send(());
        })
        .expect("failed to spawn worker join watcher thread");

    if rx.recv_timeout(timeout).is_err() {
        warn!(worker = %id, "worker thread has not joined within shutdown_join_timeout, still waiting");
    }
    let _ = watcher.join();
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use scriptbridge_engine::{Context, RefContext, Stash};
    use scriptbridge_runtime::EventLoopConfig;

    use super::*;
    use crate::backend::ReferenceBackend;

    #[test]
    fn spawn_publishes_a_running_child_and_drop_tears_it_down() {
        let mut parent_loop = EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build());
        let parent_handle = parent_loop.handle();
        let slot = parent_loop.context_mut().stash().insert(scriptbridge_engine::Value::Undefined);

        let data = WorkerData::spawn(
            WorkerId::new(),
            Arc::new(ReferenceBackend),
            WorkerConfig::builder().build(),
            parent_handle,
            slot,
            "about:blank".to_string(),
        );

        assert!(!data.child_handle().is_terminated());
        drop(data);
    }

    #[test]
    fn destroy_context_runs_before_drop_returns() {
        struct FlagBackend(Arc<AtomicBool>);

        impl WorkerBackend for FlagBackend {
            fn create_context(&self) -> Box<dyn Context> { Box::new(RefContext::new()) }

            fn load_url(
                &self,
                _ctx: &mut dyn Context,
                _loop_: &mut EventLoop,
                _url: &str,
            ) -> crate::error::Result<()> {
                Ok(())
            }

            fn destroy_context(&self, _ctx: Box<dyn Context>) { self.0.store(true, Ordering::SeqCst); }
        }

        let mut parent_loop = EventLoop::new(Box::new(RefContext::new()), EventLoopConfig::builder().build());
        let parent_handle = parent_loop.handle();
        let slot = parent_loop.context_mut().stash().insert(scriptbridge_engine::Value::Undefined);
        let destroyed = Arc::new(AtomicBool::new(false));

        let data = WorkerData::spawn(
            WorkerId::new(),
            Arc::new(FlagBackend(Arc::clone(&destroyed))),
            WorkerConfig::builder().build(),
            parent_handle,
            slot,
            "about:blank".to_string(),
        );
        drop(data);

        assert!(destroyed.load(Ordering::SeqCst));
    }
}
