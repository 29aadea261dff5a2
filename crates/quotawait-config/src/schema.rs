use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main quotawait configuration
///
/// Configuration is loaded from (in priority order):
/// 1. `quotawait.jsonc` - JSON with comments
/// 2. `quotawait.json` - Standard JSON
/// 3. `quotawait.yml` / `quotawait.yaml` - YAML format
/// 4. `quotawait.toml` - TOML format
///
/// Also checks hidden variants (`.quotawait.*`) and `~/.config/quotawait/` for global config.
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotawaitConfig {
    /// How to invoke the assistant
    #[serde(default)]
    pub assistant: AssistantSettings,

    /// Availability probe settings
    #[serde(default)]
    pub probe: ProbeSettings,

    /// Reset time arithmetic and countdown settings
    #[serde(default)]
    pub schedule: ScheduleSettings,

    /// Live activity display
    #[serde(default)]
    pub display: DisplaySettings,

    /// Diagnostic logging
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Where resume tasks and activity logs live (default: `~/.quotawait`)
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

impl QuotawaitConfig {
    /// Resolved state directory.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|h| h.join(".quotawait"))
            .or_else(|| dirs::data_dir().map(|d| d.join("quotawait")))
            .unwrap_or_else(|| PathBuf::from(".quotawait"))
    }

    pub fn resume_dir(&self) -> PathBuf {
        self.state_dir().join("resume")
    }

    pub fn activity_dir(&self) -> PathBuf {
        self.state_dir().join("activity")
    }
}

// ============================================================================
// Assistant Configuration
// ============================================================================

/// Assistant invocation
///
/// `{prompt}` in any argument is replaced by the task description.
///
/// # Example
///
/// ```yaml
/// assistant:
///   command: claude
///   args: ["-p", "{prompt}", "--output-format", "stream-json", "--verbose"]
///   working_directory: ${HOME}/src/project
///   env:
///     CLAUDE_CODE_MAX_OUTPUT_TOKENS: "32000"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantSettings {
    #[serde(default = "default_assistant_command")]
    pub command: String,

    #[serde(default = "default_assistant_args")]
    pub args: Vec<String>,

    #[serde(default)]
    pub working_directory: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            command: default_assistant_command(),
            args: default_assistant_args(),
            working_directory: None,
            env: HashMap::new(),
        }
    }
}

fn default_assistant_command() -> String {
    "claude".to_string()
}

fn default_assistant_args() -> Vec<String> {
    vec![
        "-p".to_string(),
        "{prompt}".to_string(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--verbose".to_string(),
    ]
}

// ============================================================================
// Probe Configuration
// ============================================================================

/// Availability probe settings
///
/// # Example
///
/// ```yaml
/// probe:
///   prompt: "Reply with the single word OK."
///   args: ["-p", "{prompt}"]
///   timeout_secs: 60
///   retry_delay_secs: 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Fixed trivial prompt
    #[serde(default = "default_probe_prompt")]
    pub prompt: String,

    /// Arguments for the probe invocation (default: single-turn print mode)
    #[serde(default = "default_probe_args")]
    pub args: Vec<String>,

    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,

    /// Extra wait before the one and only probe retry
    #[serde(default = "default_probe_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            prompt: default_probe_prompt(),
            args: default_probe_args(),
            timeout_secs: default_probe_timeout(),
            retry_delay_secs: default_probe_retry_delay(),
        }
    }
}

fn default_probe_prompt() -> String {
    "Reply with the single word OK.".to_string()
}

fn default_probe_args() -> Vec<String> {
    vec!["-p".to_string(), "{prompt}".to_string()]
}

fn default_probe_timeout() -> u64 {
    60
}

fn default_probe_retry_delay() -> u64 {
    300
}

// ============================================================================
// Schedule Configuration
// ============================================================================

/// Reset time arithmetic
///
/// # Example
///
/// ```yaml
/// schedule:
///   safety_buffer_secs: 120
///   stale_fallback_secs: 300
///   countdown_report_secs: 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Added past the stated reset instant, never subtracted
    #[serde(default = "default_safety_buffer")]
    pub safety_buffer_secs: u64,

    /// Wait used when an epoch notice is already in the past
    #[serde(default = "default_stale_fallback")]
    pub stale_fallback_secs: u64,

    /// How often the waiter prints the remaining time
    #[serde(default = "default_countdown_report")]
    pub countdown_report_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            safety_buffer_secs: default_safety_buffer(),
            stale_fallback_secs: default_stale_fallback(),
            countdown_report_secs: default_countdown_report(),
        }
    }
}

fn default_safety_buffer() -> u64 {
    120
}

fn default_stale_fallback() -> u64 {
    300
}

fn default_countdown_report() -> u64 {
    60
}

// ============================================================================
// Display Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Cap for content previews in activity records
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Append activity records to `<state_dir>/activity/`
    #[serde(default = "default_true")]
    pub activity_log: bool,

    /// Colored terminal output
    #[serde(default = "default_true")]
    pub colors: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            activity_log: true,
            colors: true,
        }
    }
}

fn default_preview_chars() -> usize {
    160
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json_output: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_output: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
