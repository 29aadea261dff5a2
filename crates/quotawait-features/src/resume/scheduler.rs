//! Creation, launch and bookkeeping of resume tasks

use super::error::{ResumeError, ResumeResult};
use super::process::{is_process_alive, spawn_detached, terminate_process};
use super::types::{ResumeTask, ResumeTaskSummary, SchedulerContext};
use chrono::{DateTime, Utc};
use quotawait_protocol::{QuotaNotice, ResetSchedule, ResumeStatus};
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const MAX_ID_SUFFIX: u32 = 1000;

pub fn validate_task_id(id: &str) -> ResumeResult<()> {
    static TASK_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^resume-\d{8}-\d{6}-\d{3}(?:-\d+)?$").expect("Invalid task ID regex")
    });

    if !TASK_ID_PATTERN.is_match(id) {
        return Err(ResumeError::InvalidTaskId(id.to_string()));
    }
    Ok(())
}

/// Owns the resume directory: one `<id>.json` manifest, one `<id>.log` and,
/// while a waiter runs, one `<id>.pid` per task.
#[derive(Debug, Clone)]
pub struct ResumeScheduler {
    ctx: SchedulerContext,
}

impl ResumeScheduler {
    pub fn new(ctx: SchedulerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SchedulerContext {
        &self.ctx
    }

    pub fn resume_dir(&self) -> &Path {
        &self.ctx.resume_dir
    }

    pub fn manifest_path(&self, id: &str) -> PathBuf {
        self.ctx.resume_dir.join(format!("{}.json", id))
    }

    pub fn log_path(&self, id: &str) -> PathBuf {
        self.ctx.resume_dir.join(format!("{}.log", id))
    }

    pub fn pid_path(&self, id: &str) -> PathBuf {
        self.ctx.resume_dir.join(format!("{}.pid", id))
    }

    /// Write a pending task and launch its waiter.
    pub fn schedule(
        &self,
        continuation: &str,
        schedule: ResetSchedule,
        notice: Option<QuotaNotice>,
    ) -> ResumeResult<ResumeTask> {
        let mut task = self.create_task(continuation, schedule, notice)?;

        match self.launch(&task) {
            Ok(pid) => {
                task.pid = Some(pid);
                Ok(task)
            }
            Err(e) => {
                let message = e.to_string();
                let _ = self.update(&task.id, |t| {
                    t.status = ResumeStatus::Failed;
                    t.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    pub fn create_task(
        &self,
        continuation: &str,
        schedule: ResetSchedule,
        notice: Option<QuotaNotice>,
    ) -> ResumeResult<ResumeTask> {
        self.create_task_at(continuation, schedule, notice, Utc::now())
    }

    /// Write a new pending manifest. Ids derive from `created_at`; a second
    /// task created in the same millisecond gets a `-2`, `-3`, ... suffix.
    pub fn create_task_at(
        &self,
        continuation: &str,
        schedule: ResetSchedule,
        notice: Option<QuotaNotice>,
        created_at: DateTime<Utc>,
    ) -> ResumeResult<ResumeTask> {
        fs::create_dir_all(&self.ctx.resume_dir)?;

        let base = format!("resume-{}", created_at.format("%Y%m%d-%H%M%S-%3f"));
        let mut resume_command = self.ctx.resume_command.clone();
        resume_command.push(continuation.to_string());

        for n in 1..=MAX_ID_SUFFIX {
            let id = if n == 1 {
                base.clone()
            } else {
                format!("{}-{}", base, n)
            };

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.manifest_path(&id))
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let task = ResumeTask {
                id,
                continuation: continuation.to_string(),
                schedule,
                notice,
                created_at,
                updated_at: created_at,
                status: ResumeStatus::Pending,
                pid: None,
                resume_command,
                probe_attempts: 0,
                last_probe: None,
                resume_exit_code: None,
                last_error: None,
            };
            file.write_all(serde_json::to_string_pretty(&task)?.as_bytes())?;

            tracing::info!(task_id = %task.id, resume_at = %task.resume_at(), "Created resume task");
            return Ok(task);
        }

        Err(ResumeError::IdExhausted(base))
    }

    /// Start the detached waiter for `task`, returning its PID.
    pub fn launch(&self, task: &ResumeTask) -> ResumeResult<u32> {
        if self.ctx.waiter_command.is_empty() {
            return Err(ResumeError::EmptyCommand);
        }

        let mut argv = self.ctx.waiter_command.clone();
        argv.push(task.id.clone());

        let pid = spawn_detached(&argv, &self.log_path(&task.id))?;
        self.write_pid(&task.id, pid)?;

        tracing::info!(task_id = %task.id, pid, "Launched resume waiter");
        Ok(pid)
    }

    pub fn load(&self, id: &str) -> ResumeResult<ResumeTask> {
        validate_task_id(id)?;
        let content = match fs::read_to_string(self.manifest_path(id)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ResumeError::TaskNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, task: &ResumeTask) -> ResumeResult<()> {
        validate_task_id(&task.id)?;
        let path = self.manifest_path(&task.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(task)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load, modify and save a manifest, bumping `updated_at`.
    pub fn update<F>(&self, id: &str, apply: F) -> ResumeResult<ResumeTask>
    where
        F: FnOnce(&mut ResumeTask),
    {
        let mut task = self.load(id)?;
        apply(&mut task);
        task.updated_at = Utc::now();
        self.save(&task)?;
        Ok(task)
    }

    pub fn write_pid(&self, id: &str, pid: u32) -> ResumeResult<()> {
        fs::write(self.pid_path(id), pid.to_string())?;
        Ok(())
    }

    pub fn clear_pid(&self, id: &str) {
        let _ = fs::remove_file(self.pid_path(id));
    }

    /// PID of the task's waiter, from the pid file or else the manifest
    pub fn waiter_pid(&self, task: &ResumeTask) -> Option<u32> {
        fs::read_to_string(self.pid_path(&task.id))
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .or(task.pid)
    }

    pub fn summarize(&self, task: ResumeTask) -> ResumeTaskSummary {
        let alive = !task.status.is_terminal()
            && self.waiter_pid(&task).map(is_process_alive).unwrap_or(false);
        let remaining_seconds = task.schedule.remaining_seconds(Utc::now());
        ResumeTaskSummary {
            task,
            alive,
            remaining_seconds,
        }
    }

    /// All tasks in the resume directory, oldest first.
    pub fn list(&self) -> ResumeResult<Vec<ResumeTaskSummary>> {
        let entries = match fs::read_dir(&self.ctx.resume_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(".json").map(str::to_string)
            })
            .filter(|id| validate_task_id(id).is_ok())
            .collect();
        ids.sort();

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(&id) {
                Ok(task) => summaries.push(self.summarize(task)),
                Err(e) => tracing::warn!(task_id = %id, error = %e, "Skipping unreadable resume task"),
            }
        }
        Ok(summaries)
    }

    pub fn get(&self, id: &str) -> ResumeResult<ResumeTaskSummary> {
        Ok(self.summarize(self.load(id)?))
    }

    /// Last `lines` lines of the task's log (empty before the waiter wrote any).
    pub fn read_log_tail(&self, id: &str, lines: usize) -> ResumeResult<Vec<String>> {
        self.load(id)?;
        let content = match fs::read_to_string(self.log_path(id)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].iter().map(|s| s.to_string()).collect())
    }

    /// Stop the task's waiter and mark it cancelled.
    pub fn cancel(&self, id: &str) -> ResumeResult<ResumeTask> {
        let task = self.load(id)?;
        if task.status.is_terminal() {
            return Err(ResumeError::NotCancellable {
                id: id.to_string(),
                status: task.status,
            });
        }

        if let Some(pid) = self.waiter_pid(&task) {
            if is_process_alive(pid) && !terminate_process(pid) {
                tracing::warn!(task_id = %id, pid, "Could not signal resume waiter");
            }
        }
        self.clear_pid(id);

        let task = self.update(id, |t| t.status = ResumeStatus::Cancelled)?;
        tracing::info!(task_id = %id, "Cancelled resume task");
        Ok(task)
    }

    /// Remove the files of every finished task. Returns the removed ids.
    pub fn prune(&self) -> ResumeResult<Vec<String>> {
        let mut removed = Vec::new();
        for summary in self.list()? {
            if !summary.task.status.is_terminal() {
                continue;
            }
            let id = summary.task.id;
            for path in [self.manifest_path(&id), self.log_path(&id), self.pid_path(&id)] {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            removed.push(id);
        }
        Ok(removed)
    }
}
