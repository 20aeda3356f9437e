//! `IntervalReporter` (§4.4): the outer loop. Owns the log file and the `HistogramHub`, drives
//! the `SamplingRecorder` to each reporting deadline in turn, and writes one interval line per
//! tick.

use std::fs::File;
use std::io::BufWriter;

use log::info;

use crate::config::Configuration;
use crate::errors::Result;
use crate::histogram::interval_log::{wall_clock_millis, IntervalLogWriter};
use crate::histogram::HistogramHub;
use crate::sampling::{AdvanceOutcome, SamplingRecorder};

/// Either time domain a reporting deadline can be expressed in, matching whichever
/// `SamplingRecorder` variant is driving this reporter (§4.4 step 2).
#[derive(Debug, Clone, Copy)]
enum Clock {
    /// Monotonic nanoseconds, for `SamplingRecorder::Live`.
    MonotonicNs { interval_ns: u64 },
    /// The input file's own millisecond timeline, for `SamplingRecorder::File`.
    FileMs { interval_ms: u64 },
}

pub struct IntervalReporter<W: std::io::Write> {
    hub: HistogramHub,
    sampler: SamplingRecorder,
    log: IntervalLogWriter<W>,
    clock: Clock,
    deadline: u64,
    start_tick: u64,
    base_time_ms: i64,
    run_start_ms: i64,
    interval_start_ms: i64,
    tag: Option<&'static str>,
}

impl IntervalReporter<BufWriter<File>> {
    /// Opens `config.log_path`, writes the header, and builds a reporter driving `sampler`
    /// against `hub`. `start_ns_or_ms` is the sampler-domain clock reading at the moment
    /// reporting begins (post warm-up).
    pub fn create(
        config: &Configuration,
        hub: HistogramHub,
        sampler: SamplingRecorder,
        start_ns_or_ms: u64,
        tag: Option<&'static str>,
    ) -> Result<IntervalReporter<BufWriter<File>>> {
        let file = File::create(&config.log_path)?;
        let writer = BufWriter::new(file);
        let mut log = IntervalLogWriter::new(writer, config.csv_format);

        let wall_now_ms = wall_clock_millis();
        let run_start_ms = if config.start_time_at_zero { 0 } else { wall_now_ms };
        log.write_header(run_start_ms, run_start_ms)?;
        log.flush()?;

        let clock = match &sampler {
            SamplingRecorder::Live(_) => Clock::MonotonicNs {
                interval_ns: config.reporting_interval_ns,
            },
            SamplingRecorder::File(_) => Clock::FileMs {
                interval_ms: config.reporting_interval_ns / 1_000_000,
            },
        };
        let deadline = next_deadline(start_ns_or_ms, clock);

        info!("writing interval log to {}", config.log_path.display());

        Ok(IntervalReporter {
            hub,
            sampler,
            log,
            clock,
            deadline,
            start_tick: start_ns_or_ms,
            base_time_ms: run_start_ms,
            run_start_ms,
            interval_start_ms: run_start_ms,
            tag,
        })
    }
}

impl<W: std::io::Write> IntervalReporter<W> {
    /// Drives one reporting interval to completion: advances the sampler to the next deadline,
    /// swaps the histogram, and writes the resulting line if it carries any samples. Returns
    /// `false` once the sampler has terminated (file EOF, or a stopped live sampler), signalling
    /// the caller's outer loop to stop.
    pub fn tick(&mut self) -> Result<bool> {
        let outcome = self.sampler.advance_to(self.deadline);
        let reached = match outcome {
            AdvanceOutcome::ReachedDeadline(now) => now,
            AdvanceOutcome::Terminated => self.deadline,
        };

        let interval_end_ms = self.interval_end_ms(reached);
        let ih = self.hub.swap_interval(self.interval_start_ms, interval_end_ms);
        if ih.total_count() > 0 {
            self.log.write_interval(&ih, self.base_time_ms, self.tag)?;
            self.log.flush()?;
        }
        self.interval_start_ms = interval_end_ms;

        self.deadline = next_deadline(reached, self.clock);
        Ok(!matches!(outcome, AdvanceOutcome::Terminated))
    }

    fn interval_end_ms(&self, reached: u64) -> i64 {
        let elapsed = reached.saturating_sub(self.start_tick);
        match self.clock {
            Clock::MonotonicNs { .. } => self.run_start_ms + (elapsed / 1_000_000) as i64,
            Clock::FileMs { .. } => self.run_start_ms + elapsed as i64,
        }
    }

    /// Milliseconds elapsed on the sampler's own timeline since reporting began, as of the last
    /// completed interval. Used by file-mode runs to bound `run_time_ns` against the input's
    /// timeline rather than wall-clock time (§4.7).
    pub fn elapsed_ms(&self) -> i64 {
        self.interval_start_ms - self.run_start_ms
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.sampler.terminate();
        self.log.flush()
    }
}

fn next_deadline(now: u64, clock: Clock) -> u64 {
    match clock {
        Clock::MonotonicNs { interval_ns } => now.saturating_add(interval_ns.max(1)),
        Clock::FileMs { interval_ms } => now.saturating_add(interval_ms.max(1)),
    }
}
