//! Destinations for activity records

use chrono::{DateTime, Local};
use quotawait_protocol::ActivityRecord;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait ActivitySink: Send {
    fn emit(&mut self, record: &ActivityRecord);
}

impl ActivitySink for Vec<ActivityRecord> {
    fn emit(&mut self, record: &ActivityRecord) {
        self.push(record.clone());
    }
}

/// Append-only session log (`session-YYYYMMDD-HHMMSS.log`)
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    file: File,
}

impl ActivityLog {
    pub fn create(dir: &Path, started_at: DateTime<Local>) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("session-{}.log", started_at.format("%Y%m%d-%H%M%S")));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivitySink for ActivityLog {
    fn emit(&mut self, record: &ActivityRecord) {
        if let Err(e) = writeln!(self.file, "{}", record.to_log_line()) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write activity log");
        }
    }
}
