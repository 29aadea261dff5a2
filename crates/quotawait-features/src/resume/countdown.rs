use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Format a number of seconds as "2h 05m 09s", "5m 09s" or "9s"
pub fn format_remaining(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Timestamped lines appended to a resume task's log, optionally echoed to
/// stdout when the waiter runs in the foreground.
#[derive(Debug, Clone)]
pub struct WaiterLog {
    path: PathBuf,
    echo: bool,
}

impl WaiterLog {
    pub fn new(path: PathBuf, echo: bool) -> Self {
        Self { path, echo }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn line(&self, message: &str) {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        let log_line = format!("[{}] {}\n", timestamp, message);

        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = file.write_all(log_line.as_bytes());
        }

        if self.echo {
            print!("{}", log_line);
        }
    }
}

/// Sleep `total_seconds` in `tick` steps, logging the remaining time every
/// `report_every` seconds and once at the start.
pub async fn countdown(total_seconds: u64, tick: Duration, report_every: u64, log: &WaiterLog) {
    let mut remaining = total_seconds;
    log.line(&format!("⏳ {} until resume", format_remaining(remaining)));

    while remaining > 0 {
        tokio::time::sleep(tick).await;
        remaining -= 1;

        if remaining > 0 && report_every > 0 && remaining % report_every == 0 {
            log.line(&format!("⏳ {} remaining", format_remaining(remaining)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "0s");
        assert_eq!(format_remaining(45), "45s");
        assert_eq!(format_remaining(330), "5m 30s");
        assert_eq!(format_remaining(920), "15m 20s");
        assert_eq!(format_remaining(7509), "2h 05m 09s");
    }

    #[tokio::test]
    async fn test_countdown_reports_to_log() {
        let dir = TempDir::new().unwrap();
        let log = WaiterLog::new(dir.path().join("task.log"), false);

        countdown(4, Duration::from_millis(1), 2, &log).await;

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("⏳ 4s until resume"));
        assert!(lines[1].ends_with("⏳ 2s remaining"));
    }

    #[tokio::test]
    async fn test_zero_countdown_returns_immediately() {
        let dir = TempDir::new().unwrap();
        let log = WaiterLog::new(dir.path().join("task.log"), false);
        countdown(0, Duration::from_secs(3600), 60, &log).await;
        assert!(std::fs::read_to_string(log.path()).unwrap().contains("0s until resume"));
    }
}
