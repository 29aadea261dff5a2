use super::error::SessionError;
use std::fmt;
use std::path::PathBuf;

/// Where the unit of work for one run comes from.
///
/// Whatever the source, the loaded prompt text is also the continuation
/// token stored with a resume task, so a resumed run replays the same work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    Inline(String),
    File(PathBuf),
    /// Handed back by a resume waiter
    Continuation(String),
}

impl TaskSource {
    pub fn load(&self) -> Result<String, SessionError> {
        let prompt = match self {
            Self::Inline(text) | Self::Continuation(text) => text.clone(),
            Self::File(path) => std::fs::read_to_string(path).map_err(|source| SessionError::PromptFile {
                path: path.clone(),
                source,
            })?,
        };

        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        Ok(prompt)
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => write!(f, "inline prompt"),
            Self::File(path) => write!(f, "prompt file {}", path.display()),
            Self::Continuation(_) => write!(f, "resumed continuation"),
        }
    }
}
