//! The driving loop: one assistant run, watched for quota exhaustion

use super::activity::ActivitySink;
use super::error::SessionError;
use super::task_source::TaskSource;
use crate::assistant::AssistantCommand;
use crate::quota::{detect_notice, scan_for_notice, ResetTimeCalculator};
use crate::resume::{format_remaining, ResumeScheduler, ResumeTask};
use crate::stream::{read_capped_line, LineRead, StreamClassifier, DEFAULT_PREVIEW_CHARS, MAX_LINE_BYTES};
use chrono::Utc;
use quotawait_protocol::{
    ActivityKind, QuotaNotice, ResetSchedule, EXIT_FAILURE, EXIT_QUOTA_EXHAUSTED, EXIT_SUCCESS,
};
use std::process::Stdio;
use tokio::io::BufReader;

/// Everything a run needs, assembled by the caller
#[derive(Debug, Clone)]
pub struct RunnerContext {
    pub assistant: AssistantCommand,
    pub calculator: ResetTimeCalculator,
    /// `None` disables scheduling; the run still reports quota exhaustion
    pub scheduler: Option<ResumeScheduler>,
    pub preview_chars: usize,
    /// Output lines longer than this are truncated and kept as plain text
    pub max_line_bytes: usize,
}

impl RunnerContext {
    pub fn new(assistant: AssistantCommand) -> Self {
        Self {
            assistant,
            calculator: ResetTimeCalculator::default(),
            scheduler: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }

    pub fn with_calculator(mut self, calculator: ResetTimeCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn with_scheduler(mut self, scheduler: ResumeScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed,
    QuotaExhausted {
        notice: QuotaNotice,
        schedule: ResetSchedule,
        task: Option<ResumeTask>,
    },
    Failed {
        exit_code: Option<i32>,
        reason: String,
    },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => EXIT_SUCCESS,
            Self::QuotaExhausted { .. } => EXIT_QUOTA_EXHAUSTED,
            Self::Failed { .. } => EXIT_FAILURE,
        }
    }
}

pub struct SessionRunner {
    ctx: RunnerContext,
}

impl SessionRunner {
    pub fn new(ctx: RunnerContext) -> Self {
        Self { ctx }
    }

    /// Run the assistant on `source`, streaming activity records to `sink`.
    ///
    /// The first quota notice on stdout ends the run immediately: the
    /// assistant is killed and a resume task is scheduled for the same
    /// prompt. Stderr is only checked once the assistant has exited.
    pub async fn run(
        &self,
        source: &TaskSource,
        sink: &mut dyn ActivitySink,
    ) -> Result<RunOutcome, SessionError> {
        let prompt = source.load()?;
        let classifier = StreamClassifier::new(self.ctx.preview_chars);

        let mut cmd = self.ctx.assistant.build(&prompt);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SessionError::Spawn {
            program: self.ctx.assistant.program.clone(),
            source,
        })?;
        tracing::info!(program = %self.ctx.assistant.program, %source, "Started assistant");

        let stdout = child.stdout.take().ok_or(SessionError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(SessionError::MissingPipe("stderr"))?;

        // Drained to EOF whatever the encoding, so the assistant never blocks
        // or dies writing to a full or closed stderr pipe.
        let max_line_bytes = self.ctx.max_line_bytes;
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut collected = Vec::new();
            loop {
                match read_capped_line(&mut reader, &mut buf, max_line_bytes).await {
                    Ok(LineRead::Eof) => break,
                    Ok(_) => collected.push(String::from_utf8_lossy(&buf).into_owned()),
                    Err(e) => {
                        tracing::debug!(error = %e, "Stopped reading assistant stderr");
                        break;
                    }
                }
            }
            collected
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let mut stdout_notice = None;

        loop {
            let read = read_capped_line(&mut reader, &mut buf, max_line_bytes).await?;
            if read == LineRead::Eof {
                break;
            }
            if read == LineRead::Truncated {
                tracing::debug!(max_line_bytes, "Truncated oversized assistant output line");
            }
            let line = String::from_utf8_lossy(&buf);

            let (event, record) = classifier.process_read(&line, read);
            sink.emit(&record);

            if let Some(notice) = event.notice_candidate().and_then(detect_notice) {
                stdout_notice = Some(notice);
                break;
            }
        }

        if let Some(notice) = stdout_notice {
            let _ = child.start_kill();
            let _ = child.wait().await;
            stderr_task.abort();
            return self.quota_exhausted(notice, &prompt, &classifier, sink);
        }

        let status = child.wait().await?;
        let stderr_lines = stderr_task.await.unwrap_or_default();

        if let Some(notice) = scan_for_notice(stderr_lines.iter().map(String::as_str)) {
            return self.quota_exhausted(notice, &prompt, &classifier, sink);
        }

        if status.success() {
            tracing::info!("Assistant run completed");
            return Ok(RunOutcome::Completed);
        }

        let status_text = match status.code() {
            Some(code) => format!("assistant exited with code {}", code),
            None => "assistant terminated by signal".to_string(),
        };
        let reason = match stderr_lines.iter().rev().map(|l| l.trim()).find(|l| !l.is_empty()) {
            Some(last) => format!("{}: {}", status_text, last),
            None => status_text,
        };
        sink.emit(&classifier.note(ActivityKind::Error, reason.clone()));
        tracing::warn!(exit_code = ?status.code(), "Assistant run failed");

        Ok(RunOutcome::Failed {
            exit_code: status.code(),
            reason,
        })
    }

    fn quota_exhausted(
        &self,
        notice: QuotaNotice,
        continuation: &str,
        classifier: &StreamClassifier,
        sink: &mut dyn ActivitySink,
    ) -> Result<RunOutcome, SessionError> {
        let schedule = self.ctx.calculator.calculate(&notice, Utc::now());
        tracing::warn!(
            reset_instant = %schedule.reset_instant,
            wait_seconds = schedule.wait_seconds,
            "Assistant quota exhausted"
        );
        sink.emit(&classifier.note(
            ActivityKind::Quota,
            format!(
                "quota exhausted; resets at {} ({}), resuming in {}",
                schedule.reset_instant.format("%Y-%m-%d %H:%M:%S UTC"),
                schedule.zone,
                format_remaining(schedule.wait_seconds)
            ),
        ));

        let task = match &self.ctx.scheduler {
            Some(scheduler) => {
                let task = scheduler.schedule(continuation, schedule.clone(), Some(notice.clone()))?;
                sink.emit(&classifier.note(
                    ActivityKind::Quota,
                    format!(
                        "scheduled resume task {}{}",
                        task.id,
                        task.pid.map(|pid| format!(" (pid {})", pid)).unwrap_or_default()
                    ),
                ));
                Some(task)
            }
            None => None,
        };

        Ok(RunOutcome::QuotaExhausted {
            notice,
            schedule,
            task,
        })
    }
}
