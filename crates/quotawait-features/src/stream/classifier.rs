use quotawait_protocol::StreamEvent;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Loosely-typed view of one structured line.
///
/// Every field is an untyped [`Value`] so that a field with an unexpected shape
/// degrades that field only, never the whole line.
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(default)]
    subtype: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    text: Option<Value>,
    #[serde(default)]
    duration_ms: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Classify one line of assistant output.
///
/// Total over its input: any string yields exactly one event.
pub fn classify_line(line: &str) -> StreamEvent {
    let trimmed = line.trim();

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => value,
        _ => {
            return StreamEvent::Unclassified {
                raw_line: line.to_string(),
            }
        }
    };

    let raw: RawEvent = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(_) => {
            return StreamEvent::Unclassified {
                raw_line: line.to_string(),
            }
        }
    };

    let kind = raw.kind.as_ref().and_then(Value::as_str);
    match kind {
        Some("system") => StreamEvent::System {
            subtype: raw.subtype.as_ref().and_then(as_string),
        },
        Some("user") => StreamEvent::UserTurn,
        Some("assistant") => {
            let blocks = content_blocks(&raw);
            first_tool_use(&blocks).unwrap_or_else(|| StreamEvent::AssistantText {
                text: joined_text(&blocks)
                    .or_else(|| raw.text.as_ref().and_then(as_string))
                    .unwrap_or_default(),
            })
        }
        Some("result") => {
            let blocks = content_blocks(&raw);
            first_tool_use(&blocks).unwrap_or_else(|| StreamEvent::Result {
                text: raw
                    .result
                    .as_ref()
                    .and_then(as_string)
                    .or_else(|| joined_text(&blocks))
                    .unwrap_or_default(),
                duration_ms: raw.duration_ms.as_ref().and_then(as_millis),
            })
        }
        Some("error") => StreamEvent::Error {
            message: error_message(&raw).unwrap_or_else(|| trimmed.to_string()),
        },
        Some("ping") => StreamEvent::Ping,
        other => StreamEvent::Unrecognized {
            event_type: other.map(str::to_string),
            raw_line: line.to_string(),
        },
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn as_millis(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// Content blocks from top-level `content` or `message.content`.
///
/// Blocks decode one at a time; a malformed block becomes `Other`.
fn content_blocks(raw: &RawEvent) -> Vec<ContentBlock> {
    let content = raw
        .content
        .as_ref()
        .or_else(|| raw.message.as_ref().and_then(|m| m.get("content")));

    match content {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                serde_json::from_value::<ContentBlock>(item.clone()).unwrap_or(ContentBlock::Other)
            })
            .collect(),
        Some(Value::String(text)) => vec![ContentBlock::Text { text: text.clone() }],
        _ => Vec::new(),
    }
}

fn first_tool_use(blocks: &[ContentBlock]) -> Option<StreamEvent> {
    blocks.iter().find_map(|block| match block {
        ContentBlock::ToolUse { id, name, input } => Some(StreamEvent::ToolUse {
            name: name.clone(),
            id: id.clone(),
            input: match input {
                Value::Object(map) => map.clone(),
                Value::Null => Map::new(),
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other.clone());
                    map
                }
            },
        }),
        _ => None,
    })
}

fn joined_text(blocks: &[ContentBlock]) -> Option<String> {
    let parts: Vec<&str> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn error_message(raw: &RawEvent) -> Option<String> {
    let from_error = raw.error.as_ref().and_then(|error| match error {
        Value::Object(obj) => obj
            .get("message")
            .and_then(as_string)
            .or_else(|| Some(error.to_string())),
        other => as_string(other),
    });

    from_error.or_else(|| raw.message.as_ref().and_then(as_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_use_inside_result_content() {
        let line = r#"{"type":"result","content":[{"type":"tool_use","name":"create_file","input":{"filePath":"/a/b.py","content":"..."}}]}"#;
        match classify_line(line) {
            StreamEvent::ToolUse { name, input, .. } => {
                assert_eq!(name, "create_file");
                assert_eq!(input.get("filePath"), Some(&json!("/a/b.py")));
            }
            other => panic!("expected tool use, got {:?}", other),
        }
    }

    #[test]
    fn test_not_json_is_unclassified() {
        assert_eq!(
            classify_line("not json at all"),
            StreamEvent::Unclassified {
                raw_line: "not json at all".to_string()
            }
        );
    }

    #[test]
    fn test_system_init() {
        let line = r#"{"type":"system","subtype":"init","session_id":"abc","tools":["Bash"]}"#;
        assert_eq!(
            classify_line(line),
            StreamEvent::System {
                subtype: Some("init".to_string())
            }
        );
    }

    #[test]
    fn test_user_turn() {
        let line = r#"{"type":"user","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1","content":"ok"}]}}"#;
        assert_eq!(classify_line(line), StreamEvent::UserTurn);
    }

    #[test]
    fn test_assistant_text_joins_blocks() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"first"},{"type":"thinking","thinking":"hmm"},{"type":"text","text":"second"}]}}"#;
        assert_eq!(
            classify_line(line),
            StreamEvent::AssistantText {
                text: "first\nsecond".to_string()
            }
        );
    }

    #[test]
    fn test_assistant_tool_use_from_message_content() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Let me look"},{"type":"tool_use","id":"toolu_1","name":"Read","input":{"file_path":"/src/main.rs"}}]}}"#;
        match classify_line(line) {
            StreamEvent::ToolUse { name, id, input } => {
                assert_eq!(name, "Read");
                assert_eq!(id.as_deref(), Some("toolu_1"));
                assert_eq!(input["file_path"], "/src/main.rs");
            }
            other => panic!("expected tool use, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_block_does_not_poison_line() {
        // second block is a tool_use without a name
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"still here"},{"type":"tool_use","input":{}}]}}"#;
        assert_eq!(
            classify_line(line),
            StreamEvent::AssistantText {
                text: "still here".to_string()
            }
        );
    }

    #[test]
    fn test_result_with_duration() {
        let line = r#"{"type":"result","subtype":"success","is_error":false,"duration_ms":12345,"result":"All done."}"#;
        assert_eq!(
            classify_line(line),
            StreamEvent::Result {
                text: "All done.".to_string(),
                duration_ms: Some(12345)
            }
        );
    }

    #[test]
    fn test_result_with_odd_duration_type() {
        let line = r#"{"type":"result","result":"x","duration_ms":"soon"}"#;
        assert_eq!(
            classify_line(line),
            StreamEvent::Result {
                text: "x".to_string(),
                duration_ms: None
            }
        );
    }

    #[test]
    fn test_error_shapes() {
        assert_eq!(
            classify_line(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#),
            StreamEvent::Error {
                message: "Overloaded".to_string()
            }
        );
        assert_eq!(
            classify_line(r#"{"type":"error","error":"boom"}"#),
            StreamEvent::Error {
                message: "boom".to_string()
            }
        );
        assert_eq!(
            classify_line(r#"{"type":"error","message":"plain"}"#),
            StreamEvent::Error {
                message: "plain".to_string()
            }
        );
    }

    #[test]
    fn test_ping() {
        assert_eq!(classify_line(r#"{"type":"ping"}"#), StreamEvent::Ping);
    }

    #[test]
    fn test_unknown_type_is_unrecognized() {
        let line = r#"{"type":"stream_event","event":{}}"#;
        assert_eq!(
            classify_line(line),
            StreamEvent::Unrecognized {
                event_type: Some("stream_event".to_string()),
                raw_line: line.to_string()
            }
        );

        let line = r#"{"no_type":true}"#;
        assert!(matches!(
            classify_line(line),
            StreamEvent::Unrecognized {
                event_type: None,
                ..
            }
        ));
    }

    #[test]
    fn test_non_object_json_is_unclassified() {
        for line in ["42", "\"text\"", "[1,2]", "null", "true"] {
            assert!(
                matches!(classify_line(line), StreamEvent::Unclassified { .. }),
                "{line}"
            );
        }
    }

    #[test]
    fn test_classification_is_total() {
        let huge = format!(r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"{}"}}]}}}}"#, "a".repeat(1_000_000));
        let lines = vec![
            String::new(),
            "{".to_string(),
            "{\"type\":".to_string(),
            "{\"type\":7}".to_string(),
            "{\"type\":\"assistant\",\"message\":\"flat\"}".to_string(),
            "{\"type\":\"result\",\"content\":{\"weird\":1}}".to_string(),
            "\u{feff}{\"type\":\"ping\"}".to_string(),
            huge,
        ];
        let events: Vec<StreamEvent> = lines.iter().map(|l| classify_line(l)).collect();
        assert_eq!(events.len(), lines.len());
    }
}
