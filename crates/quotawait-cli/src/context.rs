//! Wiring configuration into runner, scheduler and probe

use anyhow::{Context, Result};
use quotawait_config::{resolve_config, QuotawaitConfig, ResolvedConfig};
use quotawait_features::quota::ResetTimeCalculator;
use quotawait_features::resume::{AvailabilityProbe, ResumeScheduler, SchedulerContext, WaiterSettings};
use quotawait_features::session::RunnerContext;
use quotawait_features::AssistantCommand;
use std::path::{Path, PathBuf};

/// Resolved configuration plus how to re-invoke this binary
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: QuotawaitConfig,
    pub config_path: Option<PathBuf>,
    exe: PathBuf,
}

impl AppContext {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let ResolvedConfig { config, path, .. } = resolve_config(config_path)?;
        let config_path = path.map(absolute).transpose()?;
        let exe = std::env::current_exe().context("Failed to locate the quotawait executable")?;

        Ok(Self {
            config,
            config_path,
            exe,
        })
    }

    /// `quotawait [--config <path>]` as an argv prefix for child processes
    fn self_command(&self) -> Vec<String> {
        let mut argv = vec![self.exe.to_string_lossy().to_string()];
        if let Some(path) = &self.config_path {
            argv.push("--config".to_string());
            argv.push(path.to_string_lossy().to_string());
        }
        argv
    }

    pub fn scheduler(&self) -> ResumeScheduler {
        let mut waiter = self.self_command();
        waiter.extend(["resume".to_string(), "wait".to_string()]);

        let mut resume = self.self_command();
        resume.extend(["run".to_string(), "--continue".to_string()]);

        ResumeScheduler::new(
            SchedulerContext::new(self.config.resume_dir())
                .with_waiter_command(waiter)
                .with_resume_command(resume),
        )
    }

    pub fn calculator(&self) -> ResetTimeCalculator {
        ResetTimeCalculator::new(&self.config.schedule)
    }

    pub fn runner_context(&self, schedule_resume: bool) -> RunnerContext {
        let ctx = RunnerContext::new(AssistantCommand::from_settings(&self.config.assistant))
            .with_calculator(self.calculator())
            .with_preview_chars(self.config.display.preview_chars);

        if schedule_resume {
            ctx.with_scheduler(self.scheduler())
        } else {
            ctx
        }
    }

    pub fn probe(&self) -> AvailabilityProbe {
        AvailabilityProbe::new(&self.config.assistant, &self.config.probe)
    }

    pub fn waiter_settings(&self) -> WaiterSettings {
        WaiterSettings::new(&self.config.schedule, &self.config.probe)
    }
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    Ok(cwd.join(path))
}
