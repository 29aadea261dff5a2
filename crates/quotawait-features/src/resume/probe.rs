//! Availability probe: a minimal assistant request after the countdown

use crate::assistant::AssistantCommand;
use crate::quota::scan_for_notice;
use async_trait::async_trait;
use quotawait_config::{AssistantSettings, ProbeSettings};
use quotawait_protocol::ProbeOutcome;
use std::process::Stdio;
use std::time::Duration;
use tokio::time::timeout;

#[async_trait]
pub trait AvailabilityCheck: Send + Sync {
    async fn check(&self) -> ProbeOutcome;
}

/// Runs the assistant once with a trivial prompt
#[derive(Debug, Clone)]
pub struct AvailabilityProbe {
    command: AssistantCommand,
    prompt: String,
    timeout: Duration,
}

impl AvailabilityProbe {
    pub fn new(assistant: &AssistantSettings, probe: &ProbeSettings) -> Self {
        Self {
            command: AssistantCommand::for_probe(assistant, probe),
            prompt: probe.prompt.clone(),
            timeout: Duration::from_secs(probe.timeout_secs),
        }
    }

    pub fn from_command(command: AssistantCommand, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command,
            prompt: prompt.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AvailabilityCheck for AvailabilityProbe {
    async fn check(&self) -> ProbeOutcome {
        let mut cmd = self.command.build(&self.prompt);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ProbeOutcome::UnknownFailure {
                    reason: format!("failed to start {}: {}", self.command.program, e),
                }
            }
        };

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ProbeOutcome::UnknownFailure {
                    reason: format!("probe I/O error: {}", e),
                }
            }
            Err(_) => {
                return ProbeOutcome::UnknownFailure {
                    reason: format!("probe timed out after {}s", self.timeout.as_secs()),
                }
            }
        };

        classify_probe_output(
            output.status.success(),
            output.status.code(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}

/// A quota notice anywhere in the output wins over the exit status.
pub fn classify_probe_output(success: bool, code: Option<i32>, stdout: &str, stderr: &str) -> ProbeOutcome {
    if let Some(notice) = scan_for_notice(stdout.lines().chain(stderr.lines())) {
        return ProbeOutcome::StillExhausted { notice };
    }

    if success {
        return ProbeOutcome::Available;
    }

    let status = match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    let reason = match stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => format!("{}: {}", status, line),
        None => status,
    };
    ProbeOutcome::UnknownFailure { reason }
}
