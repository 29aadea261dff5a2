//! Resume task error types

use quotawait_protocol::ResumeStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("invalid resume task id: {0}")]
    InvalidTaskId(String),

    #[error("resume task not found: {0}")]
    TaskNotFound(String),

    #[error("resume task {id} is already {status}")]
    NotCancellable { id: String, status: ResumeStatus },

    #[error("resume task {id} is {status} and cannot be run again")]
    NotRunnable { id: String, status: ResumeStatus },

    #[error("resume task {id} already has a running waiter (pid {pid})")]
    WaiterRunning { id: String, pid: u32 },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,

    #[error("could not allocate a unique resume task id for {0}")]
    IdExhausted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid task manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type ResumeResult<T> = Result<T, ResumeError>;
