//! The driving loop around one assistant invocation
//!
//! [`SessionRunner::run`] starts the assistant on a [`TaskSource`], streams
//! every stdout line through the classifier into an [`ActivitySink`], and
//! watches for quota notices. A notice ends the run with
//! [`RunOutcome::QuotaExhausted`] after a resume task has been scheduled.

pub mod activity;
pub mod error;
pub mod runner;
pub mod task_source;

pub use activity::{ActivityLog, ActivitySink};
pub use error::SessionError;
pub use runner::{RunOutcome, RunnerContext, SessionRunner};
pub use task_source::TaskSource;
