//! Command-line token parsing (§6): out of scope for this design except as an external contract,
//! so this module only declares the flags and hands raw values to `Configuration::from_cli`.

use clap::Parser;

/// Measures platform hiccups: execution stalls on this host independent of any workload.
#[derive(Parser, Debug, Clone)]
#[command(name = "hiccup-meter", version)]
pub struct Cli {
    /// Verbose diagnostics (raises the log level to debug).
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Log path. Supports %pid and %date placeholders.
    #[arg(short = 'l', long = "log-path")]
    pub log_path: Option<String>,

    /// Emit the interval log in CSV format instead of the HdrHistogram-compatible text format.
    #[arg(short = 'o', long = "csv")]
    pub csv: bool,

    /// Reporting interval in milliseconds.
    #[arg(short = 'i', long = "interval", default_value_t = 5000)]
    pub interval_ms: u64,

    /// Sampling resolution in milliseconds. May be fractional. 0 means a tight loop.
    #[arg(short = 'r', long = "resolution", default_value_t = 1.0)]
    pub resolution_ms: f64,

    /// Startup warm-up delay in milliseconds, discarded from the recorded histogram.
    #[arg(short = 'd', long = "delay", default_value_t = 0)]
    pub delay_ms: u64,

    /// Total runtime in milliseconds. 0 means unbounded.
    #[arg(short = 't', long = "run-time", default_value_t = 0)]
    pub run_time_ms: u64,

    /// Significant value digits, 0-5.
    #[arg(short = 's', long = "significant-digits", default_value_t = 2)]
    pub significant_digits: u8,

    /// Report interval timestamps starting at zero instead of process-uptime-relative.
    #[arg(short = '0', long = "start-at-zero")]
    pub start_time_at_zero: bool,

    /// Allocate a throwaway object per sample to expose allocator-path stalls.
    #[arg(short = 'a', long = "allocate")]
    pub allocate_objects: bool,

    /// Launch a peer control process under idle load for a concurrent baseline.
    #[arg(short = 'c', long = "control")]
    pub launch_control: bool,

    /// Disable the control process if the host has less than this many MB of memory.
    #[arg(long = "control-heap-filter-mb", default_value_t = 0)]
    pub control_heap_filter_mb: u64,

    /// Extra arguments forwarded verbatim to the control child's command line.
    #[arg(short = 'x', long = "control-extra-args")]
    pub control_extra_args: Option<String>,

    /// Replay a timestamped latency file instead of sampling this host live.
    #[arg(short = 'f', long = "input")]
    pub input_path: Option<String>,

    /// With --input: interpret each line as a pause ending at its timestamp and zero-fill gaps.
    #[arg(long = "fill-zeros")]
    pub fill_zeros: bool,

    /// Exit the process as soon as standard input closes.
    #[arg(long = "terminate-with-stdin")]
    pub terminate_with_stdin: bool,
}
