//! Waiter process management

use super::error::{ResumeError, ResumeResult};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(unix)]
fn to_pid(pid: u32) -> Option<nix::unistd::Pid> {
    // 0 and negative values address process groups, never a single waiter
    i32::try_from(pid)
        .ok()
        .filter(|&raw| raw > 0)
        .map(nix::unistd::Pid::from_raw)
}

/// Check whether a process with this PID is still running
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;

        match to_pid(pid) {
            Some(pid) => matches!(kill(pid, None), Ok(()) | Err(Errno::EPERM)),
            None => false,
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Send SIGTERM to the waiter's process group, or to the process alone when
/// it does not lead a group (a waiter started in the foreground).
pub fn terminate_process(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, killpg, Signal};

        match to_pid(pid) {
            Some(pid) => killpg(pid, Signal::SIGTERM)
                .or_else(|_| kill(pid, Signal::SIGTERM))
                .is_ok(),
            None => false,
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Start `argv` in its own process group, detached from the caller's
/// terminal, with stdout and stderr appended to `log_path`.
pub fn spawn_detached(argv: &[String], log_path: &Path) -> ResumeResult<u32> {
    let (program, args) = argv.split_first().ok_or(ResumeError::EmptyCommand)?;

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log = OpenOptions::new().create(true).append(true).open(log_path)?;
    let log_err = log.try_clone()?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().map_err(|source| ResumeError::Spawn {
        program: program.clone(),
        source,
    })?;
    Ok(child.id())
}
