//! `Configuration` (§3, §4.8): built once at startup from CLI flags, immutable thereafter.

pub mod cli;

use std::path::PathBuf;

use chrono::{Local, TimeZone};

use crate::config::cli::Cli;
use crate::errors::{Error, Result};

/// Sentinel environment variable a spawned control child checks to avoid recursively launching
/// its own control process (§6, §9 "Global state").
pub const AVOID_RECURSION_ENV: &str = "HICCUP_METER_AVOID_RECURSION";

const DEFAULT_LOG_TEMPLATE: &str = "hiccup.%date.%pid.hlog";
const LIVE_LOWEST_TRACKABLE_NS: u64 = 20_000;
const FILE_LOWEST_TRACKABLE_NS: u64 = 1;
const HIGHEST_TRACKABLE_NS: u64 = 30 * 24 * 3_600 * 1_000_000_000;

#[derive(Debug, Clone)]
pub struct Configuration {
    pub verbose: bool,
    pub resolution_ns: u64,
    pub reporting_interval_ns: u64,
    pub start_delay_ns: u64,
    pub run_time_ns: u64,
    pub log_path: PathBuf,
    pub input_path: Option<PathBuf>,
    pub fill_zeros: bool,
    pub start_time_at_zero: bool,
    pub allocate_objects: bool,
    pub launch_control: bool,
    pub control_heap_filter_mb: u64,
    pub control_extra_args: Option<String>,
    pub csv_format: bool,
    pub significant_digits: u8,
    pub lowest_trackable_ns: u64,
    pub highest_trackable_ns: u64,
    pub terminate_with_stdin: bool,
    pub pid: u32,
    pub process_start_ms: i64,
}

impl Configuration {
    /// Builds and validates a `Configuration` from parsed CLI flags (§4.8).
    pub fn from_cli(cli: Cli, process_start_ms: i64) -> Result<Configuration> {
        if cli.resolution_ms < 0.0 {
            return Err(Error::Config(format!(
                "resolution must not be negative, got {}",
                cli.resolution_ms
            )));
        }
        if cli.significant_digits > 5 {
            return Err(Error::Config(format!(
                "significant digits must be in 0..=5, got {}",
                cli.significant_digits
            )));
        }
        if cli.reporting_interval_is_zero() {
            return Err(Error::Config("reporting interval must be positive".into()));
        }

        let pid = std::process::id();
        let log_template = cli.log_path.clone().unwrap_or_else(|| DEFAULT_LOG_TEMPLATE.into());
        let log_path = PathBuf::from(substitute_placeholders(&log_template, pid, process_start_ms));

        let input_path = match &cli.input_path {
            Some(p) => {
                let path = PathBuf::from(p);
                if !path.is_file() {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("input file not readable: {}", path.display()),
                    )));
                }
                Some(path)
            }
            None => None,
        };

        let is_file_driven = input_path.is_some();
        let lowest_trackable_ns = if is_file_driven {
            FILE_LOWEST_TRACKABLE_NS
        } else {
            LIVE_LOWEST_TRACKABLE_NS
        };

        Ok(Configuration {
            verbose: cli.verbose,
            resolution_ns: (cli.resolution_ms * 1_000_000.0).round() as u64,
            reporting_interval_ns: cli.interval_ms.saturating_mul(1_000_000),
            start_delay_ns: cli.delay_ms.saturating_mul(1_000_000),
            run_time_ns: cli.run_time_ms.saturating_mul(1_000_000),
            log_path,
            input_path,
            fill_zeros: cli.fill_zeros,
            start_time_at_zero: cli.start_time_at_zero,
            allocate_objects: cli.allocate_objects,
            launch_control: cli.launch_control,
            control_heap_filter_mb: cli.control_heap_filter_mb,
            control_extra_args: cli.control_extra_args,
            csv_format: cli.csv,
            significant_digits: cli.significant_digits,
            lowest_trackable_ns,
            highest_trackable_ns: HIGHEST_TRACKABLE_NS,
            terminate_with_stdin: cli.terminate_with_stdin,
            pid,
            process_start_ms,
        })
    }

    /// The control child's log path: the parent's path with a `.c` suffix (§4.5).
    pub fn control_log_path(&self) -> PathBuf {
        let mut p = self.log_path.clone().into_os_string();
        p.push(".c");
        PathBuf::from(p)
    }
}

impl cli::Cli {
    fn reporting_interval_is_zero(&self) -> bool {
        self.interval_ms == 0
    }
}

/// Substitutes `%pid` and `%date` (`yyMMdd.HHmm` of process start time) in a log path template
/// (§4.8). Idempotent on strings without either placeholder (§8 invariant 7).
pub fn substitute_placeholders(template: &str, pid: u32, process_start_ms: i64) -> String {
    let mut result = template.replace("%pid", &pid.to_string());
    if result.contains("%date") {
        let date = Local
            .timestamp_millis_opt(process_start_ms)
            .single()
            .unwrap_or_else(|| Local.timestamp_millis_opt(0).unwrap());
        let formatted = date.format("%y%m%d.%H%M").to_string();
        result = result.replace("%date", &formatted);
    }
    result
}
