//! Resume task lifecycle types

use crate::QuotaNotice;
use serde::{Deserialize, Serialize};

/// Lifecycle of one resume task and its waiter process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    /// Manifest written, waiter not launched yet
    Pending,
    /// Waiter is counting down
    Waiting,
    /// Countdown finished, probing the assistant
    Probing,
    /// Probe succeeded, driving loop re-invoked
    Resuming,
    Resumed,
    Failed,
    Cancelled,
}

impl ResumeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resumed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ResumeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Waiting => write!(f, "waiting"),
            Self::Probing => write!(f, "probing"),
            Self::Resuming => write!(f, "resuming"),
            Self::Resumed => write!(f, "resumed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of an availability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Available,
    StillExhausted { notice: QuotaNotice },
    UnknownFailure { reason: String },
}

impl ProbeOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::StillExhausted { notice } => write!(f, "still exhausted: {}", notice.raw_text),
            Self::UnknownFailure { reason } => write!(f, "unknown failure: {}", reason),
        }
    }
}
