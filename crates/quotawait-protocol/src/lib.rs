//! Quotawait Protocol - Shared types for the quota-aware session runner
//!
//! This crate defines the fundamental types passed between quotawait components:
//! - Stream events decoded from the assistant's line-oriented output
//! - Activity records, the human-readable projection of stream events
//! - Quota notices and the reset schedules derived from them
//! - Resume task status and the exit codes surfaced to the driving loop

mod events;
mod exit;
mod quota;
mod resume;

pub use events::*;
pub use exit::*;
pub use quota::*;
pub use resume::*;
