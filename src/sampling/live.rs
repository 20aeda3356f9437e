//! The live sampler (§4.3.1): a hot loop whose own measurement overhead is the thing being
//! measured. Grounded in the teacher's `HiccupMonitor`, generalized to the `advance_to` contract
//! shared with `FileSampler` and to the coordinated-omission delegate in `HistogramRecorder`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, warn};

use crate::clock::MonotonicClock;
use crate::histogram::HistogramRecorder;
use crate::sampling::AdvanceOutcome;

/// Upper bound on how long the reporter sleeps between deadline checks while a `LiveSampler`
/// does its own, independent sampling on another thread.
const POLL_GRANULARITY_NS: u64 = 10_000_000; // 10ms

pub struct LiveSampler {
    clock: MonotonicClock,
    running: Arc<AtomicBool>,
    died: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LiveSampler {
    /// Spawns the sampling thread and returns immediately; sampling begins right away.
    pub fn start(
        resolution_ns: u64,
        allocate_objects: bool,
        clock: MonotonicClock,
        mut recorder: HistogramRecorder,
    ) -> LiveSampler {
        let running = Arc::new(AtomicBool::new(true));
        let died = Arc::new(AtomicBool::new(false));

        let thread_running = running.clone();
        let thread_died = died.clone();
        let thread_clock = clock;
        let handle = thread::Builder::new()
            .name("hiccup-sampler".into())
            .spawn(move || {
                let mut rolling_min_ns = u64::MAX;
                let mut last_ts_ns: Option<u64> = None;
                let probe = AtomicU64::new(0);

                while thread_running.load(Ordering::SeqCst) {
                    if resolution_ns > 0 {
                        thread::sleep(Duration::from_nanos(resolution_ns));
                    }
                    if allocate_objects {
                        probe_allocation(&probe);
                    }

                    let now_ns = match thread_clock.now_ns() {
                        Ok(n) => n,
                        Err(e) => {
                            error!("hiccup sampler lost its monotonic clock: {}", e);
                            thread_died.store(true, Ordering::SeqCst);
                            return;
                        }
                    };

                    match next_hiccup(now_ns, &mut last_ts_ns, &mut rolling_min_ns) {
                        Some(hiccup_ns) => {
                            if let Err(e) = recorder.record(hiccup_ns, resolution_ns) {
                                warn!("failed to record hiccup sample: {}", e);
                            }
                        }
                        None => continue,
                    }
                }
            })
            .expect("failed to spawn hiccup-sampler thread");

        LiveSampler {
            clock,
            running,
            died,
            handle: Some(handle),
        }
    }

    /// Blocks the calling (reporter) thread until the clock reaches `deadline_ns`, polling at a
    /// coarse granularity. The sampler itself runs independently on its own thread; this never
    /// touches the histogram.
    pub fn advance_to(&mut self, deadline_ns: u64) -> AdvanceOutcome {
        loop {
            if self.died.load(Ordering::SeqCst) {
                return AdvanceOutcome::Terminated;
            }
            let now_ns = match self.clock.now_ns() {
                Ok(n) => n,
                Err(_) => return AdvanceOutcome::Terminated,
            };
            if now_ns >= deadline_ns {
                return AdvanceOutcome::ReachedDeadline(now_ns);
            }
            let remaining = deadline_ns - now_ns;
            thread::sleep(Duration::from_nanos(remaining.min(POLL_GRANULARITY_NS)));
        }
    }

    /// Stops the sampling thread and joins it. Guaranteed to return within one resolution tick
    /// plus worst-case sleep granularity (§5).
    pub fn terminate(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("hiccup-sampler thread panicked");
            }
        }
    }
}

/// One step of the per-iteration algorithm in §4.3.1, steps 3-8, factored out for unit testing
/// independent of threads and sleeps.
///
/// Returns `None` on the first call (sentinel `last_ts_ns`) or if the clock appears to have gone
/// backwards (defensive; must not occur with a true monotonic clock).
fn next_hiccup(now_ns: u64, last_ts_ns: &mut Option<u64>, rolling_min_ns: &mut u64) -> Option<u64> {
    let delta = match *last_ts_ns {
        None => {
            *last_ts_ns = Some(now_ns);
            return None;
        }
        Some(prev) if now_ns < prev => {
            *last_ts_ns = Some(now_ns);
            return None;
        }
        Some(prev) => now_ns - prev,
    };
    *last_ts_ns = Some(now_ns);
    if delta < *rolling_min_ns {
        *rolling_min_ns = delta;
    }
    Some(delta - *rolling_min_ns)
}

/// Allocates a small throwaway buffer and stores a value derived from it into `probe`, a
/// location the compiler cannot prove dead, exposing allocator-path stalls (§9 `-a`).
fn probe_allocation(probe: &AtomicU64) {
    let buf: Box<[u8; 64]> = Box::new([0xAA; 64]);
    probe.store(buf[0] as u64, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_skipped() {
        let mut last_ts_ns = None;
        let mut rolling_min_ns = u64::MAX;
        assert_eq!(next_hiccup(1_000, &mut last_ts_ns, &mut rolling_min_ns), None);
        assert_eq!(last_ts_ns, Some(1_000));
    }

    #[test]
    fn hiccup_is_never_negative_and_rolling_min_is_non_increasing() {
        let mut last_ts_ns = None;
        let mut rolling_min_ns = u64::MAX;
        let deltas_as_timestamps = [0u64, 1_000_000, 2_000_300, 3_000_600, 3_100_600];
        let mut previous_min = u64::MAX;
        for &ts in &deltas_as_timestamps {
            if let Some(hiccup) = next_hiccup(ts, &mut last_ts_ns, &mut rolling_min_ns) {
                assert!(hiccup <= previous_min || rolling_min_ns <= previous_min);
                assert!(rolling_min_ns <= previous_min);
                previous_min = rolling_min_ns;
            }
        }
    }

    #[test]
    fn backwards_clock_is_defensively_skipped() {
        let mut last_ts_ns = Some(10_000);
        let mut rolling_min_ns = 500;
        assert_eq!(next_hiccup(9_000, &mut last_ts_ns, &mut rolling_min_ns), None);
        assert_eq!(last_ts_ns, Some(9_000));
    }

    #[test]
    fn live_sampler_runs_and_terminates_within_a_tick() {
        let clock = MonotonicClock::new();
        let mut hub = crate::histogram::HistogramHub::new(1, 1_000_000_000, 2).unwrap();
        let recorder = hub.new_recorder();
        let mut sampler = LiveSampler::start(1_000_000, false, clock, recorder);
        thread::sleep(Duration::from_millis(50));
        sampler.terminate();
        let ih = hub.swap_interval(0, 1);
        assert!(ih.total_count() > 0);
    }
}
