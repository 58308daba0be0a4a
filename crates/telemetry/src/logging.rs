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

use std::path::PathBuf;

use bon::Builder;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for the global `tracing` subscriber.
///
/// Built with `bon::Builder` plus `SmartDefault` so the zero-config path
/// (`LoggingConfig::default()`) is always valid. `Serialize`/`Deserialize`
/// let an embedder load this from a config file alongside its own settings.
#[derive(Debug, Clone, Builder, SmartDefault, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `RUST_LOG`-style filter directive. Defaults to `info`.
    #[builder(into)]
    #[default = "info"]
    pub filter: String,

    /// Emit JSON-formatted log lines instead of the human-readable format.
    #[default = false]
    pub json: bool,

    /// Optional directory for a rolling, non-blocking file appender. When
    /// unset, logs go to stderr only.
    pub log_dir: Option<PathBuf>,
}

/// Installs the global `tracing` subscriber.
///
/// Returns a [`WorkerGuard`] that must be kept alive for the duration of the
/// process when `log_dir` is set: dropping it flushes the non-blocking file
/// appender.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    if let Some(dir) = &config.log_dir {
        let appender = tracing_appender::rolling::daily(dir, "scriptbridge.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let registry = tracing_subscriber::registry().with(env_filter);
        if config.json {
            registry
                .with(fmt::layer().json().with_writer(writer))
                .try_init()
                .ok();
        } else {
            registry
                .with(fmt::layer().with_writer(writer))
                .try_init()
                .ok();
        }
        Some(guard)
    } else {
        let registry = tracing_subscriber::registry().with(env_filter);
        if config.json {
            registry.with(fmt::layer().json()).try_init().ok();
        } else {
            registry.with(fmt::layer()).try_init().ok();
        }
        None
    }
}
