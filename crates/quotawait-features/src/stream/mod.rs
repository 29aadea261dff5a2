//! Classification of the assistant's line-oriented output
//!
//! Each stdout line becomes exactly one [`StreamEvent`](quotawait_protocol::StreamEvent),
//! whether it is a well-formed `stream-json` event, a structured line of an
//! unknown type, or stray plain text. Events are then projected into
//! [`ActivityRecord`](quotawait_protocol::ActivityRecord)s for the live log.
//!
//! Quota notices are not handled here; the session runner checks event text
//! with [`crate::quota::parse_quota_notice`].

pub mod classifier;
pub mod reader;
pub mod render;
pub mod tools;

pub use classifier::classify_line;
pub use reader::{read_capped_line, LineRead, MAX_LINE_BYTES};
pub use render::{render_event, truncate_preview, StreamClassifier, DEFAULT_PREVIEW_CHARS};
pub use tools::{describe_tool, ToolDetail};
