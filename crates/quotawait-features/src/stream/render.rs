use super::classifier::classify_line;
use super::reader::LineRead;
use super::tools::describe_tool;
use chrono::{DateTime, Duration, Local};
use quotawait_protocol::{ActivityKind, ActivityRecord, StreamEvent};
use std::time::Instant;

pub const DEFAULT_PREVIEW_CHARS: usize = 160;

/// Flatten newlines and cut to `limit` characters, marking the cut with `…`.
pub fn truncate_preview(text: &str, limit: usize) -> String {
    let flat = text.replace('\r', "").replace('\n', " ↵ ");
    let flat = flat.trim();

    if flat.chars().count() <= limit {
        return flat.to_string();
    }

    let cut: String = flat.chars().take(limit).collect();
    format!("{}…", cut)
}

/// Project an event into its display category and text.
pub fn render_event(event: &StreamEvent, limit: usize) -> (ActivityKind, String) {
    match event {
        StreamEvent::System { subtype } => (
            ActivityKind::System,
            format!("system {}", subtype.as_deref().unwrap_or("event")),
        ),
        StreamEvent::UserTurn => (ActivityKind::User, "user turn".to_string()),
        StreamEvent::AssistantText { text } => {
            (ActivityKind::Assistant, truncate_preview(text, limit))
        }
        StreamEvent::ToolUse { name, input, .. } => {
            let detail = describe_tool(name, input, limit);
            (detail.kind(), detail.render(name))
        }
        StreamEvent::Result { text, duration_ms } => {
            let mut rendered = format!("result: {}", truncate_preview(text, limit));
            if let Some(ms) = duration_ms {
                rendered.push_str(&format!(" ({:.1}s)", *ms as f64 / 1000.0));
            }
            (ActivityKind::Result, rendered)
        }
        StreamEvent::Error { message } => (
            ActivityKind::Error,
            format!("error: {}", truncate_preview(message, limit)),
        ),
        StreamEvent::Ping => (ActivityKind::Ping, "ping".to_string()),
        StreamEvent::Unrecognized {
            event_type,
            raw_line,
        } => (
            ActivityKind::Unknown,
            format!(
                "unknown event ({}): {}",
                event_type.as_deref().unwrap_or("untyped"),
                truncate_preview(raw_line, limit)
            ),
        ),
        StreamEvent::Unclassified { raw_line } => {
            (ActivityKind::Raw, truncate_preview(raw_line, limit))
        }
    }
}

/// Line-at-a-time classifier with a monotonic clock for timestamps.
///
/// The wall clock is read once at construction; later timestamps advance with
/// an [`Instant`] so that a system clock change mid-session cannot reorder the
/// activity log.
#[derive(Debug, Clone)]
pub struct StreamClassifier {
    wall_origin: DateTime<Local>,
    clock_origin: Instant,
    preview_chars: usize,
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_CHARS)
    }
}

impl StreamClassifier {
    pub fn new(preview_chars: usize) -> Self {
        Self::with_origin(Local::now(), Instant::now(), preview_chars)
    }

    pub fn with_origin(wall_origin: DateTime<Local>, clock_origin: Instant, preview_chars: usize) -> Self {
        Self {
            wall_origin,
            clock_origin,
            preview_chars,
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        let elapsed = Duration::from_std(self.clock_origin.elapsed()).unwrap_or_else(|_| Duration::zero());
        self.wall_origin + elapsed
    }

    pub fn classify(&self, line: &str) -> StreamEvent {
        classify_line(line)
    }

    pub fn record(&self, event: &StreamEvent) -> ActivityRecord {
        let (kind, rendered) = render_event(event, self.preview_chars);
        ActivityRecord::new(self.now(), kind, rendered)
    }

    /// Record for something the runner itself reports (quota, exit status).
    pub fn note(&self, kind: ActivityKind, text: impl Into<String>) -> ActivityRecord {
        ActivityRecord::new(self.now(), kind, text)
    }

    pub fn process(&self, line: &str) -> (StreamEvent, ActivityRecord) {
        let event = self.classify(line);
        let record = self.record(&event);
        (event, record)
    }

    /// Like [`process`](Self::process), but a truncated line is kept as
    /// plain text instead of being parsed.
    pub fn process_read(&self, line: &str, read: LineRead) -> (StreamEvent, ActivityRecord) {
        let event = match read {
            LineRead::Truncated => StreamEvent::Unclassified {
                raw_line: line.to_string(),
            },
            LineRead::Complete | LineRead::Eof => self.classify(line),
        };
        let record = self.record(&event);
        (event, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("short", 10), "short");
        assert_eq!(truncate_preview("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate_preview("abcdefghijk", 10), "abcdefghij…");
        assert_eq!(truncate_preview("a\nb", 10), "a ↵ b");
    }

    #[test]
    fn test_truncate_preview_respects_char_boundaries() {
        let text = "日本語のテキスト".repeat(10);
        let cut = truncate_preview(&text, 5);
        assert_eq!(cut, "日本語のテ…");
    }

    #[test]
    fn test_tool_use_record_contains_path() {
        let classifier = StreamClassifier::default();
        let line = r#"{"type":"result","content":[{"type":"tool_use","name":"create_file","input":{"filePath":"/a/b.py","content":"..."}}]}"#;
        let (event, record) = classifier.process(line);

        assert!(matches!(event, StreamEvent::ToolUse { .. }));
        assert_eq!(record.kind, ActivityKind::FileWrite);
        assert!(record.rendered.contains("/a/b.py"));
        assert!(record.to_log_line().contains("📝 create_file /a/b.py"));
    }

    #[test]
    fn test_result_record_shows_duration() {
        let (_, rendered) = render_event(
            &StreamEvent::Result {
                text: "Done".to_string(),
                duration_ms: Some(1500),
            },
            160,
        );
        assert_eq!(rendered, "result: Done (1.5s)");
    }

    #[test]
    fn test_unrecognized_renders_as_unknown_event() {
        let classifier = StreamClassifier::default();
        let (_, record) = classifier.process(r#"{"type":"telemetry","n":1}"#);
        assert_eq!(record.kind, ActivityKind::Unknown);
        assert!(record.rendered.starts_with("unknown event (telemetry)"));
    }

    #[test]
    fn test_oversized_line_is_summarized() {
        let classifier = StreamClassifier::new(100);
        let line = "x".repeat(50_000);
        let (event, record) = classifier.process(&line);
        assert!(matches!(event, StreamEvent::Unclassified { .. }));
        assert_eq!(record.rendered.chars().count(), 101);
    }

    #[test]
    fn test_truncated_json_is_not_parsed() {
        let classifier = StreamClassifier::default();
        let (event, _) = classifier.process_read(r#"{"type":"ping"}"#, LineRead::Truncated);
        assert!(matches!(event, StreamEvent::Unclassified { .. }));
        let (event, _) = classifier.process_read(r#"{"type":"ping"}"#, LineRead::Complete);
        assert_eq!(event, StreamEvent::Ping);
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let classifier = StreamClassifier::default();
        let records: Vec<ActivityRecord> = ["a", "{\"type\":\"ping\"}", "b"]
            .iter()
            .map(|line| classifier.process(line).1)
            .collect();
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_every_line_yields_one_record() {
        let classifier = StreamClassifier::default();
        let input = "not json\n{\"type\":\"system\",\"subtype\":\"init\"}\n{\"broken\":\n\n{\"type\":\"ping\"}";
        let records: Vec<_> = input.lines().map(|l| classifier.process(l)).collect();
        assert_eq!(records.len(), 5);
    }
}
