//! `Orchestrator` (§4.7): wires `Configuration`, `HistogramHub`, `SamplingRecorder`, and
//! `IntervalReporter` together, runs the warm-up epoch, drives the reporting loop, and handles
//! termination (elapsed run time, sampler exhaustion, or an external signal).

use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::clock::MonotonicClock;
use crate::config::Configuration;
use crate::control::{ControlProcessSupervisor, StdinSeverMonitor};
use crate::errors::Result;
use crate::histogram::HistogramHub;
use crate::reporter::IntervalReporter;
use crate::sampling::{FileSampler, LiveSampler, SamplingRecorder};

pub fn run(config: Configuration) -> Result<()> {
    let shutdown = install_signal_handler()?;

    let _stdin_sever = if config.terminate_with_stdin {
        Some(StdinSeverMonitor::start(1))
    } else {
        None
    };

    let control = if config.launch_control && config.input_path.is_none() {
        let current_exe = std::env::current_exe()?;
        match ControlProcessSupervisor::launch(&config, current_exe.as_os_str()) {
            Ok(supervisor) => supervisor,
            Err(e) => {
                warn!("control process not launched: {}", e);
                None
            }
        }
    } else {
        None
    };

    let result = match &config.input_path {
        Some(path) => run_file(&config, path, &shutdown),
        None => run_live(&config, &shutdown),
    };

    if let Some(supervisor) = control {
        supervisor.shutdown();
    }

    result
}

fn run_live(config: &Configuration, shutdown: &Arc<AtomicBool>) -> Result<()> {
    let clock = MonotonicClock::new();
    let mut hub = HistogramHub::new(config.lowest_trackable_ns, config.highest_trackable_ns, config.significant_digits)?;

    let run_start_ns = clock.now_ns()?;
    if config.start_delay_ns > 0 {
        let warmup_recorder = hub.new_recorder();
        let mut warmup = LiveSampler::start(config.resolution_ns, config.allocate_objects, clock, warmup_recorder);
        warmup.advance_to(run_start_ns + config.start_delay_ns);
        warmup.terminate();
        hub.reset();
    }

    let reporting_start_ns = clock.now_ns()?;
    let recorder = hub.new_recorder();
    let sampler = LiveSampler::start(config.resolution_ns, config.allocate_objects, clock, recorder);
    let sampling = SamplingRecorder::Live(sampler);

    let mut reporter = IntervalReporter::create(config, hub, sampling, reporting_start_ns, None)?;

    let deadline_ns = if config.run_time_ns > 0 {
        Some(reporting_start_ns + config.run_time_ns)
    } else {
        None
    };

    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("shutdown signal received, stopping");
            break;
        }
        if let Some(deadline) = deadline_ns {
            if clock.now_ns()? >= deadline {
                info!("configured run time elapsed, stopping");
                break;
            }
        }
        if !reporter.tick()? {
            info!("sampler terminated, stopping");
            break;
        }
    }

    reporter.shutdown()
}

fn run_file(config: &Configuration, path: &std::path::Path, shutdown: &Arc<AtomicBool>) -> Result<()> {
    let (hub, recorder) = HistogramHub::new_local(
        config.lowest_trackable_ns,
        config.highest_trackable_ns,
        config.significant_digits,
    )?;
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut sampler = FileSampler::new(reader, config.resolution_ns, config.fill_zeros, recorder);

    let start_delay_ms = (config.start_delay_ns / 1_000_000) as f64;
    if start_delay_ms > 0.0 {
        sampler.skip_until(start_delay_ms);
    }

    let sampling = SamplingRecorder::File(sampler);
    let mut reporter = IntervalReporter::create(config, hub, sampling, start_delay_ms as u64, None)?;

    let run_time_ms = (config.run_time_ns / 1_000_000) as i64;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("shutdown signal received, stopping");
            break;
        }
        if !reporter.tick()? {
            info!("input exhausted, stopping");
            break;
        }
        if run_time_ms > 0 && reporter.elapsed_ms() >= run_time_ms {
            info!("configured run time elapsed, stopping");
            break;
        }
    }

    reporter.shutdown()
}

fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, flag.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, flag.clone())?;
    Ok(flag)
}
