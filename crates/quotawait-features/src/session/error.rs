use crate::resume::ResumeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to start assistant {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("assistant {0} was not captured")]
    MissingPipe(&'static str),

    #[error("failed to schedule resume: {0}")]
    Schedule(#[from] ResumeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
