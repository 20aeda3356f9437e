//! `ControlProcessSupervisor` (§4.5): spawns a peer measurement process under idle load, used as
//! a concurrent baseline against the primary sampler. Grounded in the teacher's own
//! child-process-as-peer pattern (`hiccup_monitor.rs` spawning a background thread); generalized
//! here to an OS process since the whole point is an independently scheduled peer.

use std::ffi::OsStr;
use std::fs;
use std::process::{Child, Command, Stdio};
use std::thread;

use log::{info, warn};

use crate::config::{Configuration, AVOID_RECURSION_ENV};
use crate::errors::{Error, Result};

pub struct ControlProcessSupervisor {
    child: Option<Child>,
    stdin: Option<std::process::ChildStdin>,
}

impl ControlProcessSupervisor {
    /// Spawns the control child unless the recursion sentinel is set or the heap filter trips.
    /// Returns `Ok(None)` (not an error) whenever the supervisor declines to launch, since the
    /// control process is advisory (§7 `ChildProcessError`).
    pub fn launch(config: &Configuration, current_exe: &OsStr) -> Result<Option<ControlProcessSupervisor>> {
        if std::env::var(AVOID_RECURSION_ENV).as_deref() == Ok("true") {
            info!("control process launch suppressed by {}", AVOID_RECURSION_ENV);
            return Ok(None);
        }
        if config.control_heap_filter_mb > 0 && !host_meets_memory_floor(config.control_heap_filter_mb) {
            info!(
                "control process disabled: host memory below {} MB filter",
                config.control_heap_filter_mb
            );
            return Ok(None);
        }

        let args = control_child_args(config);
        if config.verbose {
            info!("launching control process: {:?} {:?}", current_exe, args);
        }

        let mut command = Command::new(current_exe);
        command
            .args(&args)
            .env(AVOID_RECURSION_ENV, "true")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|e| Error::ChildProcess(format!("failed to spawn control process: {}", e)))?;

        // Keep the stdin handle alive so it stays open for the child's whole lifetime; dropping
        // it is this supervisor's termination signal to the child's own StdinSeverMonitor.
        let stdin = child.stdin.take();

        Ok(Some(ControlProcessSupervisor {
            child: Some(child),
            stdin,
        }))
    }

    /// Closes the child's stdin, which the control child interprets as a termination signal, then
    /// joins it on a background thread so the caller never blocks on the child's own shutdown
    /// (§4.5 "does not wait synchronously"). Child exit status is logged, not propagated: a
    /// control-process failure never fails the primary run (§7).
    pub fn shutdown(mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = thread::Builder::new()
                .name("hiccup-control-watcher".into())
                .spawn(move || match child.wait() {
                    Ok(status) if !status.success() => {
                        warn!("control process exited with {}", status)
                    }
                    Err(e) => warn!("failed to wait on control process: {}", e),
                    _ => {}
                });
        }
    }
}

/// Derives the control child's command line from the parent's configuration (§6,
/// "Control-child command line"): inherited resolution/interval/delay/significant-digits/
/// start-at-zero/CSV flags, the `.c`-suffixed log path, and `--terminate-with-stdin`.
fn control_child_args(config: &Configuration) -> Vec<String> {
    let mut args = vec![
        "--terminate-with-stdin".to_string(),
        "--log-path".to_string(),
        config.control_log_path().display().to_string(),
        "--interval".to_string(),
        (config.reporting_interval_ns / 1_000_000).to_string(),
        "--resolution".to_string(),
        format!("{}", config.resolution_ns as f64 / 1_000_000.0),
        "--delay".to_string(),
        (config.start_delay_ns / 1_000_000).to_string(),
        "--significant-digits".to_string(),
        config.significant_digits.to_string(),
    ];
    if config.start_time_at_zero {
        args.push("--start-at-zero".to_string());
    }
    if config.csv_format {
        args.push("--csv".to_string());
    }
    if let Some(extra) = &config.control_extra_args {
        args.extend(extra.split_whitespace().map(str::to_string));
    }
    args
}

/// ADDED substitution for the Java tool's JVM-heap filter (§4.5, §9): reads total physical
/// memory from `/proc/meminfo` on Linux. Elsewhere, the filter can never disable the control
/// process, since there is no portable equivalent.
fn host_meets_memory_floor(floor_mb: u64) -> bool {
    #[cfg(target_os = "linux")]
    {
        match fs::read_to_string("/proc/meminfo") {
            Ok(contents) => match parse_mem_total_mb(&contents) {
                Some(total_mb) => total_mb >= floor_mb,
                None => true,
            },
            Err(_) => true,
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = floor_mb;
        true
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mem_total_mb(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mem_total_from_meminfo_format() {
        let sample = "MemTotal:       16384000 kB\nMemFree:         1000 kB\n";
        assert_eq!(parse_mem_total_mb(sample), Some(16000));
    }

    #[test]
    fn missing_mem_total_line_returns_none() {
        assert_eq!(parse_mem_total_mb("Bogus: 1\n"), None);
    }
}
