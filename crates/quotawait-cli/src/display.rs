//! Terminal output

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use quotawait_features::resume::{format_remaining, ResumeTaskSummary};
use quotawait_features::session::{ActivityLog, ActivitySink};
use quotawait_protocol::{ActivityKind, ActivityRecord, ResetSchedule, ResumeStatus};

/// Prints records to stdout and mirrors them into the session log
pub struct TerminalSink {
    log: Option<ActivityLog>,
}

impl TerminalSink {
    pub fn new(log: Option<ActivityLog>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> Option<&ActivityLog> {
        self.log.as_ref()
    }
}

impl ActivitySink for TerminalSink {
    fn emit(&mut self, record: &ActivityRecord) {
        println!("{}", colorize(record));
        if let Some(log) = &mut self.log {
            log.emit(record);
        }
    }
}

pub fn colorize(record: &ActivityRecord) -> String {
    let timestamp = format!("[{}]", record.timestamp.format("%H:%M:%S")).dimmed();
    let rendered = match record.kind {
        ActivityKind::FileWrite | ActivityKind::FileEdit => record.rendered.green(),
        ActivityKind::Command => record.rendered.yellow(),
        ActivityKind::FileRead | ActivityKind::Search => record.rendered.cyan(),
        ActivityKind::Result => record.rendered.green().bold(),
        ActivityKind::Error => record.rendered.red(),
        ActivityKind::Quota => record.rendered.magenta().bold(),
        ActivityKind::System | ActivityKind::Ping | ActivityKind::User => record.rendered.dimmed(),
        ActivityKind::Unknown | ActivityKind::Raw => record.rendered.normal(),
        ActivityKind::Assistant | ActivityKind::Tool => record.rendered.normal(),
    };
    format!("{} {} {}", timestamp, record.kind.icon(), rendered)
}

fn local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn display_schedule(schedule: &ResetSchedule) {
    println!("{}", "Reset schedule:".cyan().bold());
    println!("  {:<14} {} ({})", "Reset at", local(schedule.reset_instant), schedule.zone);
    println!(
        "  {:<14} {} (incl. {}s buffer)",
        "Wait",
        format_remaining(schedule.wait_seconds),
        schedule.safety_buffer_seconds
    );
    println!("  {:<14} {}", "Resume at", local(schedule.resume_at()));
    if schedule.zone_fallback {
        println!("  {}", "Zone not recognized; computed in UTC".yellow());
    }
    if schedule.stale {
        println!("  {}", "Reset time already passed; using fallback wait".yellow());
    }
}

fn status_label(summary: &ResumeTaskSummary) -> String {
    let status = summary.task.status;
    let label = if summary.is_orphaned() {
        format!("{} (orphaned)", status)
    } else {
        status.to_string()
    };

    match status {
        ResumeStatus::Resumed => label.green().to_string(),
        ResumeStatus::Failed => label.red().to_string(),
        ResumeStatus::Cancelled => label.dimmed().to_string(),
        _ if summary.is_orphaned() => label.yellow().to_string(),
        _ => label.cyan().to_string(),
    }
}

pub fn display_resume_list(summaries: &[ResumeTaskSummary]) {
    if summaries.is_empty() {
        println!("No resume tasks found.");
        return;
    }

    println!(
        "{:<30} {:<22} {:<20} {:>11} {:<8}",
        "TASK ID", "STATUS", "RESUME AT", "REMAINING", "PID"
    );
    println!("{}", "-".repeat(95));

    for summary in summaries {
        let task = &summary.task;
        let remaining = if task.status.is_terminal() {
            "-".to_string()
        } else {
            format_remaining(summary.remaining_seconds)
        };
        let pid = task.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());

        println!(
            "{:<30} {:<22} {:<20} {:>11} {:<8}",
            task.id,
            pad_colored(&status_label(summary), &status_plain(summary), 22),
            local(task.resume_at()),
            remaining,
            pid
        );
    }
}

fn status_plain(summary: &ResumeTaskSummary) -> String {
    if summary.is_orphaned() {
        format!("{} (orphaned)", summary.task.status)
    } else {
        summary.task.status.to_string()
    }
}

/// Width formatting counts ANSI escapes, so pad by the plain text length.
fn pad_colored(colored: &str, plain: &str, width: usize) -> String {
    let pad = width.saturating_sub(plain.chars().count());
    format!("{}{}", colored, " ".repeat(pad))
}

pub fn display_task(summary: &ResumeTaskSummary, log_tail: &[String]) {
    let task = &summary.task;
    println!("{} {}", "Resume task:".cyan().bold(), task.id.yellow());
    println!("{}", "─".repeat(60).dimmed());
    println!("{:<14} {}", "Status".cyan(), status_label(summary));
    println!("{:<14} {}", "Created".cyan(), local(task.created_at));
    println!("{:<14} {}", "Resume at".cyan(), local(task.resume_at()));
    if !task.status.is_terminal() {
        println!("{:<14} {}", "Remaining".cyan(), format_remaining(summary.remaining_seconds));
    }
    if let Some(pid) = task.pid {
        let state = if summary.alive { "running" } else { "not running" };
        println!("{:<14} {} ({})", "Waiter pid".cyan(), pid, state);
    }
    if let Some(notice) = &task.notice {
        println!("{:<14} {}", "Notice".cyan(), notice.raw_text.dimmed());
    }
    println!("{:<14} {}", "Continuation".cyan(), truncate(&task.continuation, 60));
    if let Some(probe) = &task.last_probe {
        println!("{:<14} {} (attempt {})", "Last probe".cyan(), probe, task.probe_attempts);
    }
    if let Some(code) = task.resume_exit_code {
        println!("{:<14} {}", "Resume exit".cyan(), code);
    }
    if let Some(error) = &task.last_error {
        println!("{:<14} {}", "Error".red(), error);
    }

    println!("{}", "─".repeat(60).dimmed());
    if log_tail.is_empty() {
        println!("{}", "(log is empty)".dimmed());
    } else {
        for line in log_tail {
            println!("{}", line);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max_len {
        flat
    } else {
        let cut: String = flat.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a\nb", 10), "a b");
        assert_eq!(truncate("abcdefghijklmnop", 10), "abcdefg...");
    }

    #[test]
    fn test_pad_colored_uses_plain_width() {
        let padded = pad_colored("\u{1b}[36mwaiting\u{1b}[0m", "waiting", 10);
        assert!(padded.ends_with("   "));
        assert!(padded.starts_with("\u{1b}[36mwaiting"));
    }

    #[test]
    fn test_colorize_keeps_icon_and_text() {
        colored::control::set_override(false);
        let record = ActivityRecord::new(Local::now(), ActivityKind::Command, "Bash $ ls");
        let line = colorize(&record);
        assert!(line.ends_with("💻 Bash $ ls"));
    }
}
