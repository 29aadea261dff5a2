//! Tracing setup shared by the foreground runner and the detached waiter.
//!
//! Diagnostics always go to stderr so that stdout stays reserved for activity
//! records. The waiter's stderr is redirected into its log file, so it runs
//! without ANSI colors.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json_output: bool,

    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_output: false,
            ansi: default_ansi(),
        }
    }
}

impl TelemetryConfig {
    pub fn new(level: impl Into<String>, json_output: bool) -> Self {
        Self {
            level: level.into(),
            json_output,
            ansi: true,
        }
    }

    /// Plain-text variant for output that lands in a log file.
    pub fn for_log_file(mut self) -> Self {
        self.ansi = false;
        self
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_ansi() -> bool {
    true
}

fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_subscriber(config: &TelemetryConfig) {
    let filter = build_filter(config);

    let result = if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.ansi)
                    .with_target(false),
            )
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
