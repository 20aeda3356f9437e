//! The Attacher, redesigned (§9 design note, §6 "Attach interface").
//!
//! The original tool's attach mode injects a Java agent into a running JVM by PID. There is no
//! Rust equivalent of agent injection into an arbitrary running process, so this binary instead
//! spawns a fresh `hiccup-meter` process against the current host and supervises it, the same way
//! `ControlProcessSupervisor` supervises a control child. The target PID flag is kept for command-
//! line compatibility but is never dereferenced; this is called out in the binary's own `--help`.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use log::info;

use crate::errors::{Error, Result};

/// Spawns `hiccup-meter` with `forwarded_args` and blocks until it exits, returning its exit
/// status. `target_pid` is accepted for interface parity only.
pub fn attach(hiccup_meter_exe: &OsString, target_pid: Option<u32>, forwarded_args: &[String]) -> Result<i32> {
    if let Some(pid) = target_pid {
        info!(
            "-p/--pid {} is accepted for compatibility but ignored: this build measures the \
             current host rather than injecting into an existing process",
            pid
        );
    }

    let mut command = Command::new(hiccup_meter_exe);
    command.args(forwarded_args).stdin(Stdio::inherit());

    let status = command
        .status()
        .map_err(|e| Error::Attach(format!("failed to spawn hiccup-meter: {}", e)))?;

    Ok(status.code().unwrap_or(1))
}
