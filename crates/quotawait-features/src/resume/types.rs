//! Resume task types

use chrono::{DateTime, Utc};
use quotawait_config::{ProbeSettings, ScheduleSettings};
use quotawait_protocol::{ProbeOutcome, QuotaNotice, ResetSchedule, ResumeStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Persisted manifest of one scheduled resume (`<resume_dir>/<id>.json`).
///
/// Written by the scheduler before launch; after launch only the waiter
/// process updates it, except for `cancel` which first stops the waiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeTask {
    pub id: String,
    /// Opaque context handed back to the driving loop on resume
    pub continuation: String,
    pub schedule: ResetSchedule,
    #[serde(default)]
    pub notice: Option<QuotaNotice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ResumeStatus,
    #[serde(default)]
    pub pid: Option<u32>,
    /// Full argv that re-enters the driving loop
    pub resume_command: Vec<String>,
    #[serde(default)]
    pub probe_attempts: u32,
    #[serde(default)]
    pub last_probe: Option<ProbeOutcome>,
    #[serde(default)]
    pub resume_exit_code: Option<i32>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl ResumeTask {
    pub fn resume_at(&self) -> DateTime<Utc> {
        self.schedule.resume_at()
    }
}

/// A task as seen by `list`, with liveness checked at read time
#[derive(Debug, Clone)]
pub struct ResumeTaskSummary {
    pub task: ResumeTask,
    pub alive: bool,
    pub remaining_seconds: u64,
}

impl ResumeTaskSummary {
    /// Not finished, but no waiter is running for it.
    pub fn is_orphaned(&self) -> bool {
        !self.task.status.is_terminal() && !self.alive
    }
}

/// Where tasks live and how to (re)start the processes involved
#[derive(Debug, Clone)]
pub struct SchedulerContext {
    pub resume_dir: PathBuf,
    /// argv prefix that starts a waiter; the task id is appended
    pub waiter_command: Vec<String>,
    /// argv prefix that re-enters the driving loop; the continuation is appended
    pub resume_command: Vec<String>,
}

impl SchedulerContext {
    pub fn new(resume_dir: impl Into<PathBuf>) -> Self {
        Self {
            resume_dir: resume_dir.into(),
            waiter_command: Vec::new(),
            resume_command: Vec::new(),
        }
    }

    pub fn with_waiter_command(mut self, argv: Vec<String>) -> Self {
        self.waiter_command = argv;
        self
    }

    pub fn with_resume_command(mut self, argv: Vec<String>) -> Self {
        self.resume_command = argv;
        self
    }
}

/// Timing knobs of a waiter
#[derive(Debug, Clone)]
pub struct WaiterSettings {
    /// Length of one countdown step (one second outside tests)
    pub tick: Duration,
    pub report_every_secs: u64,
    pub retry_delay_secs: u64,
    /// Echo log lines to stdout (foreground waiters)
    pub echo: bool,
}

impl WaiterSettings {
    pub fn new(schedule: &ScheduleSettings, probe: &ProbeSettings) -> Self {
        Self {
            tick: Duration::from_secs(1),
            report_every_secs: schedule.countdown_report_secs,
            retry_delay_secs: probe.retry_delay_secs,
            echo: false,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

impl Default for WaiterSettings {
    fn default() -> Self {
        Self::new(&ScheduleSettings::default(), &ProbeSettings::default())
    }
}
