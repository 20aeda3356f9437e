//! The `HistogramRecorder` contract (§4.2). Live sampling is backed by `hdrhistogram`'s
//! wait-free-writer / finite-block-reader synchronization primitive (§4.2.1, §6.1); file
//! ingestion is backed by a plain `Histogram` shared on a single thread (see `LocalRecorder`
//! below) since that primitive's blocking `refresh()` is only safe when a recorder is either
//! dropped or kept alive by an independent thread that keeps recording.

use std::cell::RefCell;
use std::rc::Rc;

use hdrhistogram::sync::{Recorder, SyncHistogram};
use hdrhistogram::Histogram;

use crate::errors::{Error, Result};

/// A single interval's worth of recorded samples, stamped with the window it covers.
#[derive(Debug, Clone)]
pub struct IntervalHistogram {
    pub start_ts_ms: i64,
    pub end_ts_ms: i64,
    pub histogram: Histogram<u64>,
}

impl IntervalHistogram {
    pub fn total_count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn max(&self) -> u64 {
        self.histogram.max()
    }
}

/// The live sampler's write handle. Recording is wait-free and allocation-free on the hot path;
/// `hdrhistogram::sync::Recorder` only has to communicate with the reader on a phase shift, which
/// happens at most once per `swap_interval` call, and the sampler thread keeps recording (or is
/// dropped) across that shift so the reader is never stuck waiting on a recorder that will not
/// check in again.
#[derive(Debug)]
pub struct HistogramRecorder {
    recorder: Recorder<u64>,
}

impl HistogramRecorder {
    fn new(recorder: Recorder<u64>) -> HistogramRecorder {
        HistogramRecorder { recorder }
    }

    /// Record `value_ns`, applying coordinated-omission correction against
    /// `expected_interval_ns` (§4.2). A zero interval disables correction.
    pub fn record(&mut self, value_ns: u64, expected_interval_ns: u64) -> Result<()> {
        let outcome = if expected_interval_ns > 0 {
            self.recorder.record_correct(value_ns, expected_interval_ns)
        } else {
            self.recorder.record(value_ns)
        };
        outcome.map_err(|e| {
            Error::Histogram(format!("failed to record value {}: {:?}", value_ns, e))
        })
    }

    /// Bulk-record `count` occurrences of `value_ns` without coordinated-omission correction.
    /// Used for `fill_zeros` gap-filling.
    pub fn record_count(&mut self, value_ns: u64, count: u64) -> Result<()> {
        self.recorder.record_n(value_ns, count).map_err(|e| {
            Error::Histogram(format!(
                "failed to record {} x{}: {:?}",
                value_ns, count, e
            ))
        })
    }
}

/// The file-ingestion sampler's write handle. `FileSampler` and the `IntervalReporter` that
/// swaps it both run on the same thread, one right after the other, so there is no writer to
/// wait for and no need for `hdrhistogram::sync`'s cross-thread phase-shift protocol — a plain
/// `Histogram` shared through an `Rc<RefCell<_>>` is enough, and never blocks.
#[derive(Debug, Clone)]
pub struct LocalRecorder {
    histogram: Rc<RefCell<Histogram<u64>>>,
}

impl LocalRecorder {
    /// See [`HistogramRecorder::record`].
    pub fn record(&mut self, value_ns: u64, expected_interval_ns: u64) -> Result<()> {
        let mut histogram = self.histogram.borrow_mut();
        let outcome = if expected_interval_ns > 0 {
            histogram.record_correct(value_ns, expected_interval_ns)
        } else {
            histogram.record(value_ns)
        };
        outcome.map_err(|e| {
            Error::Histogram(format!("failed to record value {}: {:?}", value_ns, e))
        })
    }

    /// See [`HistogramRecorder::record_count`].
    pub fn record_count(&mut self, value_ns: u64, count: u64) -> Result<()> {
        self.histogram
            .borrow_mut()
            .record_n(value_ns, count)
            .map_err(|e| {
                Error::Histogram(format!("failed to record {} x{}: {:?}", value_ns, count, e))
            })
    }
}

/// The reporter's swap handle. Backed either by a cross-thread `SyncHistogram` (live sampling,
/// where the sampler runs on its own thread) or a single-threaded shared `Histogram` (file
/// ingestion, where sampler and reporter share a thread) — see module docs for why the two need
/// different backing.
pub enum HistogramHub {
    Sync(SyncHistogram<u64>),
    Local(Rc<RefCell<Histogram<u64>>>),
}

impl HistogramHub {
    /// Builds a cross-thread hub for live sampling. Mint writer handles with `new_recorder`.
    pub fn new(low: u64, high: u64, significant_digits: u8) -> Result<HistogramHub> {
        let histogram = new_bounded_histogram(low, high, significant_digits)?;
        Ok(HistogramHub::Sync(histogram.into_sync()))
    }

    /// Builds a single-threaded hub for file ingestion, together with the one `LocalRecorder`
    /// that shares its storage. There is exactly one recorder per local hub.
    pub fn new_local(low: u64, high: u64, significant_digits: u8) -> Result<(HistogramHub, LocalRecorder)> {
        let histogram = new_bounded_histogram(low, high, significant_digits)?;
        let shared = Rc::new(RefCell::new(histogram));
        let hub = HistogramHub::Local(shared.clone());
        let recorder = LocalRecorder { histogram: shared };
        Ok((hub, recorder))
    }

    /// Mint a new writer handle for a `HistogramHub::Sync`. Each live `SamplingRecorder` holds
    /// exactly one.
    pub fn new_recorder(&self) -> HistogramRecorder {
        match self {
            HistogramHub::Sync(sync) => HistogramRecorder::new(sync.recorder()),
            HistogramHub::Local(_) => {
                unreachable!("new_recorder is only valid on a HistogramHub::Sync")
            }
        }
    }

    /// Swap out the live accumulator for a cleared one, returning the prior interval's contents
    /// stamped with the window it covers.
    ///
    /// For `Sync`, this blocks briefly until all live recorders have phased — safe because the
    /// live sampler thread keeps recording independently of this call. For `Local`, this never
    /// blocks: the recorder and the hub share one `RefCell` on the same thread, so swapping is a
    /// plain borrow, clone, and reset.
    pub fn swap_interval(&mut self, start_ts_ms: i64, end_ts_ms: i64) -> IntervalHistogram {
        let histogram = match self {
            HistogramHub::Sync(sync) => {
                sync.refresh();
                let histogram = (**sync).clone();
                sync.reset();
                histogram
            }
            HistogramHub::Local(shared) => {
                let mut histogram = shared.borrow_mut();
                let snapshot = histogram.clone();
                histogram.reset();
                snapshot
            }
        };
        IntervalHistogram {
            start_ts_ms,
            end_ts_ms,
            histogram,
        }
    }

    /// Discard all counts without allocating a new structure (used after the warm-up epoch).
    pub fn reset(&mut self) {
        match self {
            HistogramHub::Sync(sync) => {
                sync.refresh();
                sync.reset();
            }
            HistogramHub::Local(shared) => shared.borrow_mut().reset(),
        }
    }
}

fn new_bounded_histogram(low: u64, high: u64, significant_digits: u8) -> Result<Histogram<u64>> {
    Histogram::new_with_bounds(low, high, significant_digits)
        .map_err(|e| Error::Config(format!("invalid histogram bounds: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_swap_observes_the_count() {
        let mut hub = HistogramHub::new(1, 1_000_000_000, 2).unwrap();
        let mut recorder = hub.new_recorder();
        recorder.record(500, 0).unwrap();
        drop(recorder);
        let ih = hub.swap_interval(0, 1000);
        assert_eq!(ih.total_count(), 1);
        assert_eq!(ih.max(), 500);
    }

    #[test]
    fn swap_clears_the_accumulator() {
        let mut hub = HistogramHub::new(1, 1_000_000_000, 2).unwrap();
        let mut recorder = hub.new_recorder();
        recorder.record(10, 0).unwrap();
        drop(recorder);
        let first = hub.swap_interval(0, 1000);
        assert_eq!(first.total_count(), 1);
        let second = hub.swap_interval(1000, 2000);
        assert_eq!(second.total_count(), 0);
    }

    #[test]
    fn coordinated_omission_backfills_decreasing_values() {
        let mut hub = HistogramHub::new(1, 1_000_000_000, 2).unwrap();
        let mut recorder = hub.new_recorder();
        // value = 3 * interval: expect counts at 300, 200, 100 (and the recorded 300 itself twice
        // is not the case -- record_correct records `value` once, plus the backfill below it).
        recorder.record(300, 100).unwrap();
        drop(recorder);
        let ih = hub.swap_interval(0, 1000);
        // one real sample at 300, plus synthetic samples at 200 and 100
        assert_eq!(ih.total_count(), 3);
    }

    #[test]
    fn local_swap_never_blocks_even_while_the_recorder_is_still_alive() {
        // unlike the Sync variant, a Local recorder does not need to be dropped (or kept alive on
        // another thread) for swap_interval to return: both live on this one thread.
        let (mut hub, mut recorder) = HistogramHub::new_local(1, 1_000_000_000, 2).unwrap();
        recorder.record(500, 0).unwrap();
        let ih = hub.swap_interval(0, 1000);
        assert_eq!(ih.total_count(), 1);
        assert_eq!(ih.max(), 500);

        recorder.record(10, 0).unwrap();
        let second = hub.swap_interval(1000, 2000);
        assert_eq!(second.total_count(), 1);
        assert_eq!(second.max(), 10);
    }

    #[test]
    fn local_coordinated_omission_backfills_decreasing_values() {
        let (mut hub, mut recorder) = HistogramHub::new_local(1, 1_000_000_000, 2).unwrap();
        recorder.record(300, 100).unwrap();
        let ih = hub.swap_interval(0, 1000);
        assert_eq!(ih.total_count(), 3);
    }
}
