//! Orphaned service process cleanup
//!
//! The native release call has been observed to leave its background service
//! process running. [`ProcessReaper::reap_orphans`] is the one place that
//! compensates for it, so the heuristic can change without touching callers.

use anyhow::{Context, Result};
use std::process::Command;
use tracing::{debug, info, warn};

/// Terminates service processes left behind after release.
pub trait ProcessReaper: Send + Sync {
    /// Returns the pids that were terminated.
    fn reap_orphans(&self) -> Result<Vec<u32>>;
}

/// Kills the first service process whose pid is greater than our own.
///
/// A higher pid is taken to mean "spawned after us", i.e. the instance this
/// run created. Pid reuse can defeat this; it is a workaround for a native
/// defect, not a general process killer.
pub struct ServiceProcessReaper {
    process_name: String,
}

impl ServiceProcessReaper {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }
}

impl ProcessReaper for ServiceProcessReaper {
    fn reap_orphans(&self) -> Result<Vec<u32>> {
        let own_pid = std::process::id();
        let pids = ProcessUtils::find_process_by_name(&self.process_name)?;
        debug!(process_name = %self.process_name, ?pids, own_pid, "Service processes still running");

        let Some(orphan) = select_orphan(&pids, own_pid) else {
            return Ok(Vec::new());
        };

        info!(process_name = %self.process_name, pid = orphan, "Killing orphaned service process");
        ProcessUtils::kill_process(orphan)?;
        Ok(vec![orphan])
    }
}

/// Reaper used when the heuristic is switched off.
pub struct NoopReaper;

impl ProcessReaper for NoopReaper {
    fn reap_orphans(&self) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }
}

fn select_orphan(pids: &[u32], own_pid: u32) -> Option<u32> {
    pids.iter().copied().find(|pid| *pid > own_pid)
}

/// Utility functions for process inspection
pub struct ProcessUtils;

impl ProcessUtils {
    /// Find pids of processes whose executable name matches `name`
    pub fn find_process_by_name(name: &str) -> Result<Vec<u32>> {
        #[cfg(unix)]
        {
            let output = Command::new("ps")
                .args(["-eo", "pid,command"])
                .output()
                .context("Failed to execute ps command")?;

            Ok(parse_ps_output(&String::from_utf8_lossy(&output.stdout), name))
        }

        #[cfg(windows)]
        {
            let image = image_name(name);
            let output = Command::new("tasklist")
                .args(["/FO", "CSV", "/NH", "/FI", &format!("IMAGENAME eq {image}")])
                .output()
                .context("Failed to execute tasklist command")?;

            Ok(parse_tasklist_output(
                &String::from_utf8_lossy(&output.stdout),
                &image,
            ))
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = name;
            Ok(Vec::new())
        }
    }

    /// Forcibly terminate a process
    pub fn kill_process(pid: u32) -> Result<()> {
        let output = kill_command(pid)
            .output()
            .context("Failed to execute kill command")?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(pid, stderr = %stderr.trim(), "Kill command failed");
            Err(anyhow::anyhow!("Failed to kill process {pid}: {}", stderr.trim()))
        }
    }
}

#[cfg(unix)]
fn kill_command(pid: u32) -> Command {
    let mut command = Command::new("kill");
    command.args([format!("-{}", libc::SIGKILL), pid.to_string()]);
    command
}

#[cfg(not(unix))]
fn kill_command(pid: u32) -> Command {
    let mut command = Command::new("taskkill");
    command.args(["/F".to_string(), "/PID".to_string(), pid.to_string()]);
    command
}

#[cfg_attr(not(unix), allow(dead_code))]
fn parse_ps_output(output: &str, name: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse::<u32>().ok()?;
            let command = parts.next()?;
            // Match the executable exactly, not arguments or log files
            let matches = command == name || command.ends_with(&format!("/{name}"));
            matches.then_some(pid)
        })
        .collect()
}

#[cfg_attr(not(windows), allow(dead_code))]
fn image_name(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".exe") {
        name.to_string()
    } else {
        format!("{name}.exe")
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
fn parse_tasklist_output(output: &str, image: &str) -> Vec<u32> {
    // "RSLogix5000Services.exe","4242","Console","1","52,120 K"
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split("\",\"").map(|f| f.trim_matches('"'));
            let process = fields.next()?;
            let pid = fields.next()?.parse::<u32>().ok()?;
            process.eq_ignore_ascii_case(image).then_some(pid)
        })
        .collect()
}
