//! Event types for the assistant's streaming output

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One classified line of assistant output.
///
/// Every line maps to exactly one variant. Lines that are not structured at all
/// land in [`StreamEvent::Unclassified`]; structured lines with a discriminator
/// we do not know land in [`StreamEvent::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Session-level notice (`init`, `compact_boundary`, ...)
    System { subtype: Option<String> },

    /// A user turn, usually carrying tool results back to the model
    UserTurn,

    /// Plain text from the assistant
    AssistantText { text: String },

    /// The assistant invoked a tool
    ToolUse {
        name: String,
        id: Option<String>,
        input: serde_json::Map<String, serde_json::Value>,
    },

    /// Final result of a run
    Result {
        text: String,
        duration_ms: Option<u64>,
    },

    /// Error reported by the assistant
    Error { message: String },

    /// Keep-alive
    Ping,

    /// Structured line with an unknown or missing `type`
    Unrecognized {
        event_type: Option<String>,
        raw_line: String,
    },

    /// Anything that is not a JSON object
    Unclassified { raw_line: String },
}

impl StreamEvent {
    /// Free text carried by the event that could hold a quota notice.
    ///
    /// Tool invocations and bookkeeping events return `None`.
    pub fn notice_candidate(&self) -> Option<&str> {
        match self {
            Self::AssistantText { text } | Self::Result { text, .. } => Some(text),
            Self::Error { message } => Some(message),
            Self::Unrecognized { raw_line, .. } | Self::Unclassified { raw_line } => {
                Some(raw_line)
            }
            _ => None,
        }
    }
}

/// Display category of an activity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    System,
    User,
    Assistant,
    FileWrite,
    FileEdit,
    FileRead,
    Command,
    Search,
    Tool,
    Result,
    Error,
    Ping,
    Unknown,
    Raw,
    Quota,
}

impl ActivityKind {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::System => "⚙️",
            Self::User => "👤",
            Self::Assistant => "💬",
            Self::FileWrite => "📝",
            Self::FileEdit => "✏️",
            Self::FileRead => "📖",
            Self::Command => "💻",
            Self::Search => "🔍",
            Self::Tool => "🔧",
            Self::Result => "✅",
            Self::Error => "❌",
            Self::Ping => "·",
            Self::Unknown => "❓",
            Self::Raw => "📄",
            Self::Quota => "⏳",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.icon())
    }
}

/// Human-readable projection of a [`StreamEvent`]. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Local>,
    pub kind: ActivityKind,
    pub rendered: String,
}

impl ActivityRecord {
    pub fn new(timestamp: DateTime<Local>, kind: ActivityKind, rendered: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            rendered: rendered.into(),
        }
    }

    /// `[HH:MM:SS] <icon> <content>`
    pub fn to_log_line(&self) -> String {
        format!(
            "[{}] {} {}",
            self.timestamp.format("%H:%M:%S"),
            self.kind.icon(),
            self.rendered
        )
    }
}

impl std::fmt::Display for ActivityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_log_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_line_format() {
        let ts = Local.with_ymd_and_hms(2025, 8, 7, 9, 5, 3).unwrap();
        let record = ActivityRecord::new(ts, ActivityKind::Result, "done (1.2s)");
        assert_eq!(record.to_log_line(), "[09:05:03] ✅ done (1.2s)");
    }

    #[test]
    fn test_notice_candidate_skips_tool_use() {
        let event = StreamEvent::ToolUse {
            name: "Bash".to_string(),
            id: None,
            input: serde_json::Map::new(),
        };
        assert!(event.notice_candidate().is_none());

        let event = StreamEvent::Result {
            text: "Claude AI usage limit reached|1754578800".to_string(),
            duration_ms: None,
        };
        assert_eq!(
            event.notice_candidate(),
            Some("Claude AI usage limit reached|1754578800")
        );
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = StreamEvent::System {
            subtype: Some("init".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "system");
        assert_eq!(json["subtype"], "init");
    }
}
