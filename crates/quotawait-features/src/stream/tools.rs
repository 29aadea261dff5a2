use super::render::truncate_preview;
use quotawait_protocol::ActivityKind;
use serde_json::{Map, Value};

/// What a tool invocation is about, for display and audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolDetail {
    FileWrite {
        path: String,
        preview: Option<String>,
    },
    FileEdit {
        path: String,
        diff: Option<String>,
    },
    FileRead {
        path: String,
    },
    Command {
        command: String,
    },
    Search {
        pattern: String,
        path: Option<String>,
    },
    Fetch {
        url: String,
    },
    Todo {
        count: usize,
    },
    Subtask {
        description: String,
    },
    Generic {
        summary: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolFamily {
    Write,
    Edit,
    Read,
    Command,
    Search,
    Fetch,
    Todo,
    Subtask,
    Other,
}

fn family(name: &str) -> ToolFamily {
    let normalized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match normalized.as_str() {
        "write" | "createfile" | "writefile" | "newfile" => ToolFamily::Write,
        "edit" | "multiedit" | "editfile" | "strreplace" | "strreplacebasededittool"
        | "replacestringinfile" | "applypatch" | "notebookedit" => ToolFamily::Edit,
        "read" | "readfile" | "view" | "viewfile" => ToolFamily::Read,
        "bash" | "shell" | "runinterminal" | "runcommand" | "terminal" => ToolFamily::Command,
        "glob" | "grep" | "search" | "filesearch" | "grepsearch" | "ls" | "listdir" => {
            ToolFamily::Search
        }
        "webfetch" | "fetch" | "fetchwebpage" => ToolFamily::Fetch,
        "todowrite" | "todos" => ToolFamily::Todo,
        "task" | "agent" | "subagent" => ToolFamily::Subtask,
        _ => ToolFamily::Other,
    }
}

const PATH_KEYS: &[&str] = &[
    "file_path",
    "filePath",
    "path",
    "notebook_path",
    "target_file",
    "filename",
];
const CONTENT_KEYS: &[&str] = &["content", "contents", "file_text", "text"];
const OLD_KEYS: &[&str] = &["old_string", "oldString", "old_str"];
const NEW_KEYS: &[&str] = &["new_string", "newString", "new_str", "new_source"];

fn first_str<'a>(input: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| input.get(*key).and_then(Value::as_str))
}

/// Extract the interesting fields of a tool invocation.
///
/// Paths, URLs and patterns are kept verbatim; free-form content is cut to
/// `limit` characters.
pub fn describe_tool(name: &str, input: &Map<String, Value>, limit: usize) -> ToolDetail {
    let path = first_str(input, PATH_KEYS).map(str::to_string);

    match (family(name), path) {
        (ToolFamily::Write, Some(path)) => ToolDetail::FileWrite {
            path,
            preview: first_str(input, CONTENT_KEYS).map(|c| truncate_preview(c, limit)),
        },
        (ToolFamily::Edit, Some(path)) => {
            let diff = match (first_str(input, OLD_KEYS), first_str(input, NEW_KEYS)) {
                (Some(old), Some(new)) => Some(format!(
                    "- {} + {}",
                    truncate_preview(old, limit / 2),
                    truncate_preview(new, limit / 2)
                )),
                (None, Some(new)) => Some(format!("+ {}", truncate_preview(new, limit))),
                _ => input
                    .get("edits")
                    .and_then(Value::as_array)
                    .map(|edits| format!("{} edits", edits.len())),
            };
            ToolDetail::FileEdit { path, diff }
        }
        (ToolFamily::Read, Some(path)) => ToolDetail::FileRead { path },
        (ToolFamily::Command, _) if input.contains_key("command") => ToolDetail::Command {
            command: truncate_preview(
                &input.get("command").map(value_text).unwrap_or_default(),
                limit,
            ),
        },
        (ToolFamily::Search, path) => match first_str(input, &["pattern", "query", "regex"]) {
            Some(pattern) => ToolDetail::Search {
                pattern: pattern.to_string(),
                path,
            },
            None => match path {
                Some(path) => ToolDetail::FileRead { path },
                None => generic(input, limit),
            },
        },
        (ToolFamily::Fetch, _) if first_str(input, &["url"]).is_some() => ToolDetail::Fetch {
            url: first_str(input, &["url"]).unwrap_or_default().to_string(),
        },
        (ToolFamily::Todo, _) => ToolDetail::Todo {
            count: input
                .get("todos")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
        },
        (ToolFamily::Subtask, _) if first_str(input, &["description", "prompt"]).is_some() => {
            ToolDetail::Subtask {
                description: truncate_preview(
                    first_str(input, &["description", "prompt"]).unwrap_or_default(),
                    limit,
                ),
            }
        }
        _ => generic(input, limit),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn generic(input: &Map<String, Value>, limit: usize) -> ToolDetail {
    let summary = input
        .iter()
        .map(|(key, value)| format!("{}={}", key, value_text(value)))
        .collect::<Vec<_>>()
        .join(", ");
    ToolDetail::Generic {
        summary: truncate_preview(&summary, limit),
    }
}

impl ToolDetail {
    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::FileWrite { .. } => ActivityKind::FileWrite,
            Self::FileEdit { .. } => ActivityKind::FileEdit,
            Self::FileRead { .. } => ActivityKind::FileRead,
            Self::Command { .. } => ActivityKind::Command,
            Self::Search { .. } | Self::Fetch { .. } => ActivityKind::Search,
            Self::Todo { .. } | Self::Subtask { .. } | Self::Generic { .. } => ActivityKind::Tool,
        }
    }

    pub fn render(&self, tool_name: &str) -> String {
        match self {
            Self::FileWrite { path, preview } => match preview {
                Some(preview) => format!("{} {} │ {}", tool_name, path, preview),
                None => format!("{} {}", tool_name, path),
            },
            Self::FileEdit { path, diff } => match diff {
                Some(diff) => format!("{} {} │ {}", tool_name, path, diff),
                None => format!("{} {}", tool_name, path),
            },
            Self::FileRead { path } => format!("{} {}", tool_name, path),
            Self::Command { command } => format!("{} $ {}", tool_name, command),
            Self::Search { pattern, path } => match path {
                Some(path) => format!("{} {:?} in {}", tool_name, pattern, path),
                None => format!("{} {:?}", tool_name, pattern),
            },
            Self::Fetch { url } => format!("{} {}", tool_name, url),
            Self::Todo { count } => format!("{} ({} items)", tool_name, count),
            Self::Subtask { description } => format!("{}: {}", tool_name, description),
            Self::Generic { summary } if summary.is_empty() => tool_name.to_string(),
            Self::Generic { summary } => format!("{} {}", tool_name, summary),
        }
    }
}
