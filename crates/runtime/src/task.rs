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

//! Off-loop work, run on a fixed-size thread pool that never touches an
//! interpreter context.

use std::sync::{
    Arc,
    mpsc::{self, Receiver, Sender},
};

use tracing::error;

use crate::metrics::TASKS_POSTED;

/// A unit of work with a single `run` operation, executed on some thread of
/// the pool. A task's closure returns `()`, not `Result`, which makes "task
/// errors are contained inside the task" structurally true rather than a
/// convention: there is nowhere to propagate an error to.
pub trait Task: Send {
    fn run(&self);
}

impl<F> Task for F
where
    F: Fn() + Send,
{
    fn run(&self) { self() }
}

enum Job {
    Run(Box<dyn Task>),
    Shutdown,
}

/// A fixed-size pool of OS threads for `post_task` work.
///
/// Mirrors the source's use of a small thread pool (default 3 workers) kept
/// distinct from the loop thread: tasks must never touch an interpreter
/// context, so the pool has no notion of one.
pub struct ThreadPool {
    sender: Sender<Job>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(std::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| {
                let receiver: Arc<std::sync::Mutex<Receiver<Job>>> = Arc::clone(&receiver);
                std::thread::Builder::new()
                    .name(format!("scriptbridge-task-{id}"))
                    .spawn(move || Self::worker_loop(&receiver))
                    .expect("failed to spawn task pool thread")
            })
            .collect();

        ThreadPool { sender, workers }
    }

    fn worker_loop(receiver: &Arc<std::sync::Mutex<Receiver<Job>>>) {
        loop {
            let job = {
                let guard = receiver.lock().expect("task pool receiver poisoned");
                guard.recv()
            };
            match job {
                Ok(Job::Run(task)) => task.run(),
                Ok(Job::Shutdown) | Err(_) => break,
            }
        }
    }

    pub fn post(&self, task: Box<dyn Task>) {
        TASKS_POSTED.inc();
        if self.sender.send(Job::Run(task)).is_err() {
            error!("task pool is shut down, dropping posted task");
        }
    }

    pub fn size(&self) -> usize { self.workers.len() }

    /// Replaces the pool with a freshly sized one. Already-queued tasks run
    /// to completion on the old pool before its threads join; new tasks
    /// posted after this call land on the new pool.
    pub fn resize(&mut self, size: usize) {
        let size = size.max(1);
        if size == self.workers.len() {
            return;
        }
        let old = std::mem::replace(self, ThreadPool::new(size));
        old.shutdown();
    }

    pub fn shutdown(self) {
        for _ in &self.workers {
            let _ = self.sender.send(Job::Shutdown);
        }
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}
