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

use std::time::Duration;

use bon::Builder;
use smart_default::SmartDefault;

/// Configuration for an [`crate::EventLoop`].
///
/// The zero-config path (`EventLoopConfig::default()`) matches the values
/// named in §4 of the design: a 2 second idle budget and a 3-thread task
/// pool.
#[derive(Debug, Clone, Builder, SmartDefault)]
pub struct EventLoopConfig {
    /// Default idle budget: how long `run()` sleeps when no loop-runner
    /// tightens the deadline.
    #[default(Duration::from_secs(2))]
    pub idle_timeout: Duration,

    /// Size of the fixed thread pool used for `post_task` work.
    #[default = 3]
    pub task_threads: usize,
}

/// Configuration for the timer subsystem's loop-runner.
#[derive(Debug, Clone, Builder, SmartDefault)]
pub struct TimerConfig {
    /// Maximum number of expired entries promoted to loop events per tick.
    #[default = 10]
    pub max_promotions_per_tick: usize,

    /// Priority at which the timer loop-runner is registered. Lower runs
    /// earlier; 5 is "very high priority, run prior to almost everything".
    #[default = 5]
    pub priority: u32,
}
