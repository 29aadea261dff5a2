//! The waiter: count down, probe, resume once

use super::countdown::{countdown, format_remaining, WaiterLog};
use super::error::{ResumeError, ResumeResult};
use super::probe::AvailabilityCheck;
use super::process::is_process_alive;
use super::scheduler::ResumeScheduler;
use super::types::WaiterSettings;
use chrono::Utc;
use quotawait_protocol::{ProbeOutcome, ResumeStatus};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaiterOutcome {
    /// The driving loop was re-invoked and exited with this code
    Resumed { exit_code: Option<i32> },
    /// Both probes failed; the task is marked failed
    Unavailable { outcome: ProbeOutcome },
}

/// Run the waiter for task `id` in the current process.
///
/// The remaining wait is recomputed from the task's absolute resume instant,
/// so a waiter restarted late only sleeps for what is left. A failed probe is
/// retried once after `retry_delay_secs`; the driving loop is re-invoked at
/// most once.
pub async fn run_waiter(
    scheduler: &ResumeScheduler,
    id: &str,
    settings: &WaiterSettings,
    probe: &dyn AvailabilityCheck,
) -> ResumeResult<WaiterOutcome> {
    let task = scheduler.load(id)?;
    if task.status.is_terminal() {
        return Err(ResumeError::NotRunnable {
            id: id.to_string(),
            status: task.status,
        });
    }

    let own_pid = std::process::id();
    if let Some(pid) = scheduler.waiter_pid(&task) {
        if pid != own_pid && is_process_alive(pid) {
            return Err(ResumeError::WaiterRunning {
                id: id.to_string(),
                pid,
            });
        }
    }

    scheduler.write_pid(id, own_pid)?;
    let task = scheduler.update(id, |t| {
        t.status = ResumeStatus::Waiting;
        t.pid = Some(own_pid);
    })?;

    let log = WaiterLog::new(scheduler.log_path(id), settings.echo);
    log.line(&format!(
        "Resume task {} (pid {}): quota resets at {} ({}), resuming at {}",
        id,
        own_pid,
        task.schedule.reset_instant,
        task.schedule.zone,
        task.resume_at()
    ));
    tracing::info!(task_id = %id, resume_at = %task.resume_at(), "Waiting for quota reset");

    let remaining = task.schedule.remaining_seconds(Utc::now());
    countdown(remaining, settings.tick, settings.report_every_secs, &log).await;

    let mut outcome = probe_once(scheduler, id, probe, &log).await?;
    if !outcome.is_available() {
        log.line(&format!(
            "Probe failed ({}); retrying once in {}",
            outcome,
            format_remaining(settings.retry_delay_secs)
        ));
        countdown(settings.retry_delay_secs, settings.tick, settings.report_every_secs, &log).await;
        outcome = probe_once(scheduler, id, probe, &log).await?;
    }

    if !outcome.is_available() {
        let reason = outcome.to_string();
        scheduler.update(id, |t| {
            t.status = ResumeStatus::Failed;
            t.last_error = Some(reason.clone());
        })?;
        scheduler.clear_pid(id);
        log.line(&format!("Giving up: {}", reason));
        tracing::warn!(task_id = %id, %reason, "Assistant still unavailable after retry");
        return Ok(WaiterOutcome::Unavailable { outcome });
    }

    let task = scheduler.update(id, |t| t.status = ResumeStatus::Resuming)?;
    log.line(&format!("Resuming: {}", task.resume_command.join(" ")));

    let exit_code = match resume(&task.resume_command).await {
        Ok(code) => code,
        Err(e) => {
            let message = e.to_string();
            scheduler.update(id, |t| {
                t.status = ResumeStatus::Failed;
                t.last_error = Some(message.clone());
            })?;
            scheduler.clear_pid(id);
            log.line(&format!("Resume failed: {}", message));
            return Err(e);
        }
    };

    scheduler.update(id, |t| {
        t.status = ResumeStatus::Resumed;
        t.resume_exit_code = exit_code;
    })?;
    scheduler.clear_pid(id);
    log.line(&format!(
        "Driving loop exited with {}",
        exit_code.map_or_else(|| "a signal".to_string(), |c| format!("code {}", c))
    ));

    Ok(WaiterOutcome::Resumed { exit_code })
}

async fn probe_once(
    scheduler: &ResumeScheduler,
    id: &str,
    probe: &dyn AvailabilityCheck,
    log: &WaiterLog,
) -> ResumeResult<ProbeOutcome> {
    let task = scheduler.update(id, |t| {
        t.status = ResumeStatus::Probing;
        t.probe_attempts += 1;
    })?;
    log.line(&format!("Probing assistant availability (attempt {})", task.probe_attempts));

    let outcome = probe.check().await;
    log.line(&format!("Probe result: {}", outcome));

    let recorded = outcome.clone();
    scheduler.update(id, |t| t.last_probe = Some(recorded))?;
    Ok(outcome)
}

async fn resume(argv: &[String]) -> ResumeResult<Option<i32>> {
    let (program, args) = argv.split_first().ok_or(ResumeError::EmptyCommand)?;

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|source| ResumeError::Spawn {
            program: program.clone(),
            source,
        })?;
    Ok(status.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::types::SchedulerContext;
    use async_trait::async_trait;
    use quotawait_protocol::ResetSchedule;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ScriptedProbe {
        outcomes: Mutex<Vec<ProbeOutcome>>,
    }

    impl ScriptedProbe {
        fn new(mut outcomes: Vec<ProbeOutcome>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
            }
        }
    }

    #[async_trait]
    impl AvailabilityCheck for ScriptedProbe {
        async fn check(&self) -> ProbeOutcome {
            self.outcomes.lock().unwrap().pop().unwrap_or(ProbeOutcome::UnknownFailure {
                reason: "no more scripted outcomes".to_string(),
            })
        }
    }

    fn failure() -> ProbeOutcome {
        ProbeOutcome::UnknownFailure {
            reason: "503".to_string(),
        }
    }

    fn settings() -> WaiterSettings {
        WaiterSettings {
            tick: Duration::from_millis(1),
            report_every_secs: 1,
            retry_delay_secs: 2,
            echo: false,
        }
    }

    fn scheduler(dir: &TempDir, marker: &Path) -> ResumeScheduler {
        ResumeScheduler::new(
            SchedulerContext::new(dir.path().join("resume")).with_resume_command(vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("echo \"$1\" >> {}", marker.display()),
                "sh".to_string(),
            ]),
        )
    }

    fn short_schedule() -> ResetSchedule {
        let now = Utc::now();
        ResetSchedule {
            reset_instant: now,
            wait_seconds: 2,
            safety_buffer_seconds: 0,
            computed_at: now,
            zone: "UTC".to_string(),
            zone_fallback: false,
            stale: false,
        }
    }

    #[tokio::test]
    async fn test_resumes_once_when_available() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("resumed.txt");
        let scheduler = scheduler(&dir, &marker);
        let task = scheduler.create_task("ctx-42", short_schedule(), None).unwrap();

        let probe = ScriptedProbe::new(vec![ProbeOutcome::Available]);
        let outcome = run_waiter(&scheduler, &task.id, &settings(), &probe).await.unwrap();

        assert_eq!(outcome, WaiterOutcome::Resumed { exit_code: Some(0) });
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "ctx-42\n");

        let task = scheduler.load(&task.id).unwrap();
        assert_eq!(task.status, ResumeStatus::Resumed);
        assert_eq!(task.probe_attempts, 1);
        assert_eq!(task.resume_exit_code, Some(0));
        assert!(!scheduler.pid_path(&task.id).exists());

        let log = std::fs::read_to_string(scheduler.log_path(&task.id)).unwrap();
        assert!(log.contains("Probe result: available"));
        assert!(log.contains("Driving loop exited with code 0"));
    }

    #[tokio::test]
    async fn test_retries_once_then_resumes() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("resumed.txt");
        let scheduler = scheduler(&dir, &marker);
        let task = scheduler.create_task("ctx", short_schedule(), None).unwrap();

        let probe = ScriptedProbe::new(vec![failure(), ProbeOutcome::Available]);
        let outcome = run_waiter(&scheduler, &task.id, &settings(), &probe).await.unwrap();

        assert!(matches!(outcome, WaiterOutcome::Resumed { .. }));
        assert_eq!(scheduler.load(&task.id).unwrap().probe_attempts, 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_second_failure() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("resumed.txt");
        let scheduler = scheduler(&dir, &marker);
        let task = scheduler.create_task("ctx", short_schedule(), None).unwrap();

        let probe = ScriptedProbe::new(vec![failure(), failure(), ProbeOutcome::Available]);
        let outcome = run_waiter(&scheduler, &task.id, &settings(), &probe).await.unwrap();

        assert_eq!(outcome, WaiterOutcome::Unavailable { outcome: failure() });
        assert!(!marker.exists());

        let task = scheduler.load(&task.id).unwrap();
        assert_eq!(task.status, ResumeStatus::Failed);
        assert_eq!(task.probe_attempts, 2);
        assert_eq!(task.last_error.as_deref(), Some("unknown failure: 503"));
    }

    #[tokio::test]
    async fn test_finished_task_is_not_rerun() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("resumed.txt");
        let scheduler = scheduler(&dir, &marker);
        let task = scheduler.create_task("ctx", short_schedule(), None).unwrap();
        scheduler.update(&task.id, |t| t.status = ResumeStatus::Resumed).unwrap();

        let probe = ScriptedProbe::new(vec![ProbeOutcome::Available]);
        let err = run_waiter(&scheduler, &task.id, &settings(), &probe).await.unwrap_err();
        assert!(matches!(err, ResumeError::NotRunnable { .. }));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_overdue_task_skips_countdown() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("resumed.txt");
        let scheduler = scheduler(&dir, &marker);
        let mut schedule = short_schedule();
        schedule.computed_at = Utc::now() - chrono::Duration::hours(2);
        schedule.wait_seconds = 60;
        let task = scheduler.create_task("late", schedule, None).unwrap();

        let mut slow = settings();
        slow.tick = Duration::from_secs(3600);
        let probe = ScriptedProbe::new(vec![ProbeOutcome::Available]);
        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            run_waiter(&scheduler, &task.id, &slow, &probe),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(matches!(outcome, WaiterOutcome::Resumed { .. }));
    }
}
