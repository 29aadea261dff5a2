//! Feature modules for quotawait
//!
//! This crate provides the moving parts behind the `quotawait` binary:
//! - Quota notice parsing and reset time calculation
//! - Classification of the assistant's streamed output
//! - Detached resume waiters and their task registry
//! - The session runner that ties them together

pub mod assistant;
pub mod quota;
pub mod resume;
pub mod session;
pub mod stream;

pub use assistant::AssistantCommand;
pub use quota::{parse_quota_notice, ResetTimeCalculator};
pub use resume::{ResumeScheduler, SchedulerContext};
pub use session::{RunOutcome, SessionRunner, TaskSource};
pub use stream::StreamClassifier;
