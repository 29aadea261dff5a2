//! Resume scheduling after quota exhaustion
//!
//! When the assistant reports that its quota is exhausted, the session runner
//! hands the computed [`ResetSchedule`](quotawait_protocol::ResetSchedule) to a
//! [`ResumeScheduler`], which writes a task manifest and launches a detached
//! waiter process for it.
//!
//! # Features
//!
//! - **Detached waiters**: Each task gets its own process group that survives
//!   the terminal or parent that created it
//! - **Countdown**: Remaining time is recomputed from the absolute resume
//!   instant and logged periodically
//! - **Availability probe**: A trivial assistant request confirms the quota
//!   really reset; one retry after a delay, then the task fails
//! - **Resume once**: The driving loop is re-invoked with the task's
//!   continuation at most once per task
//! - **Management**: List, inspect, cancel, re-run or prune tasks
//!
//! # Task Files
//!
//! - `<state_dir>/resume/<id>.json`: Task manifest and status
//! - `<state_dir>/resume/<id>.log`: Waiter log, including output of the resumed run
//! - `<state_dir>/resume/<id>.pid`: PID of the running waiter
//!
//! Ids look like `resume-20250101-120000-123`; tasks created within the same
//! millisecond get a `-2`, `-3`, ... suffix.

pub mod countdown;
pub mod error;
pub mod probe;
pub mod process;
pub mod scheduler;
pub mod types;
pub mod waiter;

pub use countdown::{format_remaining, WaiterLog};
pub use error::{ResumeError, ResumeResult};
pub use probe::{classify_probe_output, AvailabilityCheck, AvailabilityProbe};
pub use process::{is_process_alive, terminate_process};
pub use scheduler::{validate_task_id, ResumeScheduler};
pub use types::{ResumeTask, ResumeTaskSummary, SchedulerContext, WaiterSettings};
pub use waiter::{run_waiter, WaiterOutcome};
