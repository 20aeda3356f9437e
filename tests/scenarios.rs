//! End-to-end scenarios driving the public `orchestrator::run` entry point against real temp
//! files. Durations are kept tiny so the suite stays fast and deterministic in CI.

use std::fs;
use std::io::Write;

use hiccup_meter::config::cli::Cli;
use hiccup_meter::config::Configuration;
use hiccup_meter::orchestrator;

fn cli(overrides: impl FnOnce(&mut Cli)) -> Cli {
    let mut cli = Cli {
        verbose: false,
        log_path: None,
        csv: false,
        interval_ms: 20,
        resolution_ms: 1.0,
        delay_ms: 0,
        run_time_ms: 60,
        significant_digits: 2,
        start_time_at_zero: true,
        allocate_objects: false,
        launch_control: false,
        control_heap_filter_mb: 0,
        control_extra_args: None,
        input_path: None,
        fill_zeros: false,
        terminate_with_stdin: false,
    };
    overrides(&mut cli);
    cli
}

/// S1: a short idle live run produces a well-formed log with a header and at least one interval.
#[test]
fn idle_live_run_produces_a_well_formed_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("idle.hlog");

    let cli = cli(|c| c.log_path = Some(log_path.to_str().unwrap().to_string()));
    let config = Configuration::from_cli(cli, 0).unwrap();
    orchestrator::run(config).unwrap();

    let contents = fs::read_to_string(&log_path).unwrap();
    assert!(contents.starts_with("#[Histogram log format version"));
    assert!(contents.contains("StartTimestamp"));
}

/// S2: a short idle live run with 'allocate' enabled still terminates cleanly within run_time_ms.
#[test]
fn live_run_with_allocation_probe_terminates_on_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("alloc.hlog");

    let cli = cli(|c| {
        c.log_path = Some(log_path.to_str().unwrap().to_string());
        c.allocate_objects = true;
    });
    let config = Configuration::from_cli(cli, 0).unwrap();
    orchestrator::run(config).unwrap();

    assert!(log_path.exists());
}

/// S3/S4: file-replay mode interprets each line as a pause ending at its timestamp and records
/// it into the interval covering that timestamp.
#[test]
fn file_replay_records_latency_samples_into_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("replay.hlog");
    let input_path = dir.path().join("latencies.txt");
    {
        let mut f = fs::File::create(&input_path).unwrap();
        writeln!(f, "0 0").unwrap();
        writeln!(f, "10 0").unwrap();
        writeln!(f, "20 55").unwrap();
        writeln!(f, "30 0").unwrap();
    }

    let cli = cli(|c| {
        c.log_path = Some(log_path.to_str().unwrap().to_string());
        c.input_path = Some(input_path.to_str().unwrap().to_string());
        c.interval_ms = 15;
        c.run_time_ms = 0;
    });
    let config = Configuration::from_cli(cli, 0).unwrap();
    orchestrator::run(config).unwrap();

    let contents = fs::read_to_string(&log_path).unwrap();
    let interval_lines: Vec<&str> = contents
        .lines()
        .filter(|l| !l.starts_with('#') && !l.starts_with("\"StartTimestamp\""))
        .collect();
    assert!(!interval_lines.is_empty());
}

/// S4: `--fill-zeros` produces denser intervals than the same input without it, since every gap
/// between events is backfilled with zero-latency samples.
#[test]
fn fill_zeros_produces_csv_rows_with_nonzero_counts() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("fill.hlog");
    let input_path = dir.path().join("latencies.txt");
    {
        let mut f = fs::File::create(&input_path).unwrap();
        writeln!(f, "0 0").unwrap();
        writeln!(f, "50 0").unwrap();
    }

    let cli = cli(|c| {
        c.log_path = Some(log_path.to_str().unwrap().to_string());
        c.input_path = Some(input_path.to_str().unwrap().to_string());
        c.fill_zeros = true;
        c.csv = true;
        c.resolution_ms = 5.0;
        c.interval_ms = 100;
        c.run_time_ms = 0;
    });
    let config = Configuration::from_cli(cli, 0).unwrap();
    orchestrator::run(config).unwrap();

    let contents = fs::read_to_string(&log_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next().unwrap(), "\"StartTimestamp\",\"Interval_Length\",\"Interval_Max\",\"Interval_Count\"");
    let row = lines.next().unwrap();
    let count: u64 = row.rsplit(',').next().unwrap().parse().unwrap();
    assert!(count > 0);
}

/// S5: the default log path template substitutes both placeholders, and is stable for the same
/// inputs (idempotent substitution, §8 invariant 7).
#[test]
fn log_path_template_substitutes_pid_and_date() {
    let cli = cli(|c| c.log_path = None);
    let config = Configuration::from_cli(cli, 1_717_243_500_000).unwrap();
    let path = config.log_path.to_str().unwrap().to_string();
    assert!(path.starts_with("hiccup."));
    assert!(path.ends_with(&format!("{}.hlog", std::process::id())));
    assert!(!path.contains("%pid"));
    assert!(!path.contains("%date"));
}

/// An unreadable input file is a configuration error, not a panic.
#[test]
fn missing_input_file_is_a_configuration_error() {
    let cli = cli(|c| c.input_path = Some("/nonexistent/path/to/nowhere.txt".to_string()));
    let result = Configuration::from_cli(cli, 0);
    assert!(result.is_err());
}
