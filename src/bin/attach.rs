//! Attacher entry point. See `hiccup_meter::attacher` for the redesign note: this spawns a fresh
//! measurement process rather than attaching to a running one.

use std::ffi::OsString;

use clap::Parser;
use hiccup_meter::attacher;

/// Attach and measure platform hiccups.
///
/// This build does not inject into a running process (there is no portable equivalent of
/// agent-style attach for an arbitrary PID); it spawns a fresh `hiccup-meter` against the current
/// host instead. `--pid` is accepted for command-line compatibility only.
#[derive(Parser, Debug)]
#[command(name = "hiccup-meter-attach", version)]
struct AttachCli {
    /// Target process id. Accepted for interface parity; never dereferenced.
    #[arg(short = 'p', long = "pid")]
    pid: Option<u32>,

    /// Agent jar path. Accepted for interface parity; unused in this redesign.
    #[arg(short = 'j', long = "agent-jar")]
    agent_jar: Option<String>,

    /// Arguments forwarded verbatim to the spawned hiccup-meter process.
    #[arg(last = true)]
    forward: Vec<String>,
}

fn main() {
    pretty_env_logger::init();
    let cli = AttachCli::parse();
    let _ = cli.agent_jar;

    let hiccup_meter_exe = locate_sibling_binary();
    match attacher::attach(&hiccup_meter_exe, cli.pid, &cli.forward) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("hiccup-meter-attach: {}", e);
            std::process::exit(1);
        }
    }
}

fn locate_sibling_binary() -> OsString {
    let mut path = std::env::current_exe().expect("failed to resolve current executable path");
    path.set_file_name("hiccup-meter");
    path.into_os_string()
}
