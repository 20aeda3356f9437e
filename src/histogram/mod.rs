pub mod interval_log;
pub mod recorder;

pub use recorder::{HistogramHub, HistogramRecorder, IntervalHistogram, LocalRecorder};
