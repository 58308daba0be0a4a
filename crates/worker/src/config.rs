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
use scriptbridge_runtime::EventLoopConfig;
use smart_default::SmartDefault;

/// Configuration for a spawned worker's child loop and teardown.
#[derive(Debug, Clone, Builder, SmartDefault)]
pub struct WorkerConfig {
    /// Passed straight through to the child `EventLoop`.
    #[default(EventLoopConfig::builder().build())]
    pub loop_config: EventLoopConfig,

    /// How long `Drop` waits for the child thread to join before logging a
    /// warning. The join itself is never abandoned, since there is no safe
    /// way to detach a running interpreter thread; this only controls how
    /// long we wait quietly before saying so.
    #[default(Duration::from_secs(5))]
    pub shutdown_join_timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = WorkerConfig::builder().build();
        assert_eq!(config.shutdown_join_timeout, Duration::from_secs(5));
    }
}
