//! Interval-log writer (§6, §6.1).
//!
//! No crate in this workspace's dependency tree ships a full interval-log *writer* (the
//! `hdrhistogram` crate's own `serialization::interval_log` module is reader-only), so this
//! follows the same hand-written pattern an established Rust interval-log writer uses: a
//! `V2DeflateSerializer` payload, base64-encoded, on a line with the interval's timestamps.

use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use hdrhistogram::serialization::{Serializer, V2DeflateSerializer};

use crate::errors::{Error, Result};
use crate::histogram::recorder::IntervalHistogram;

const LOG_FORMAT_VERSION: &str = "1.3";
const TEXT_LEGEND: &str =
    "\"StartTimestamp\",\"Interval_Length\",\"Interval_Max\",\"Interval_Compressed_Histogram\"";
const CSV_LEGEND: &str = "\"StartTimestamp\",\"Interval_Length\",\"Interval_Max\",\"Interval_Count\"";

/// Writes an interval log, in either the HdrHistogram-compatible textual form or a plain CSV
/// form (`-o`). Written only by the reporter thread (§5).
pub struct IntervalLogWriter<W: Write> {
    writer: W,
    csv: bool,
    serializer: V2DeflateSerializer,
}

impl<W: Write> IntervalLogWriter<W> {
    pub fn new(writer: W, csv: bool) -> IntervalLogWriter<W> {
        IntervalLogWriter {
            writer,
            csv,
            serializer: V2DeflateSerializer::new(),
        }
    }

    /// Writes the log header: format version, base/start time, legend.
    pub fn write_header(&mut self, base_time_ms: i64, start_time_ms: i64) -> Result<()> {
        if self.csv {
            self.line(CSV_LEGEND)?;
            return Ok(());
        }
        self.line(&format!("#[Histogram log format version {}]", LOG_FORMAT_VERSION))?;
        self.write_time_comment("Basetime", base_time_ms)?;
        self.write_start_time_comment(start_time_ms)?;
        self.line(TEXT_LEGEND)?;
        Ok(())
    }

    fn write_time_comment(&mut self, label: &str, millis: i64) -> Result<()> {
        let secs = millis as f64 / 1000.0;
        self.line(&format!("#[{}: {:.3} (seconds since epoch)]", label, secs))
    }

    fn write_start_time_comment(&mut self, millis: i64) -> Result<()> {
        let secs = millis as f64 / 1000.0;
        let system_time = UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64);
        let utc: DateTime<Utc> = system_time.into();
        self.line(&format!(
            "#[StartTime: {:.3} (seconds since epoch), {}]",
            secs,
            utc.to_rfc3339()
        ))
    }

    /// Writes one interval line if `ih.total_count() > 0` (§4.4 step 4d).
    pub fn write_interval(&mut self, ih: &IntervalHistogram, base_time_ms: i64, tag: Option<&str>) -> Result<()> {
        let start_sec = (ih.start_ts_ms - base_time_ms) as f64 / 1000.0;
        let length_sec = (ih.end_ts_ms - ih.start_ts_ms) as f64 / 1000.0;
        let max_value = ih.max() as f64 / 1_000_000.0; // ns -> ms, matching the histogram's own unit convention
        if self.csv {
            let line = format!(
                "{:.3},{:.3},{:.3},{}",
                start_sec,
                length_sec,
                max_value,
                ih.total_count()
            );
            return self.line(&line);
        }
        let mut encoded_histogram = Vec::new();
        self.serializer
            .serialize(&ih.histogram, &mut encoded_histogram)
            .map_err(|e| Error::Histogram(format!("failed to serialize interval: {:?}", e)))?;
        let tag_prefix = tag.map(|t| format!("Tag={},", t)).unwrap_or_default();
        let line = format!(
            "{}{:.3},{:.3},{:.3},{}",
            tag_prefix,
            start_sec,
            length_sec,
            max_value,
            base64::encode(&encoded_histogram)
        );
        self.line(&line)
    }

    fn line(&mut self, s: &str) -> Result<()> {
        self.writer.write_all(s.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::from)
    }
}

/// Current wall-clock time in milliseconds since the epoch, for header stamping.
pub fn wall_clock_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrhistogram::Histogram;

    fn sample_interval() -> IntervalHistogram {
        let mut h = Histogram::<u64>::new_with_bounds(1, 1_000_000_000, 2).unwrap();
        h.record(42).unwrap();
        IntervalHistogram {
            start_ts_ms: 0,
            end_ts_ms: 1000,
            histogram: h,
        }
    }

    #[test]
    fn text_header_then_interval_round_trips_as_text() {
        let mut buf = Vec::new();
        {
            let mut w = IntervalLogWriter::new(&mut buf, false);
            w.write_header(0, 0).unwrap();
            w.write_interval(&sample_interval(), 0, None).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("#[Histogram log format version 1.3]"));
        assert!(text.contains("#[Basetime:"));
        assert!(text.contains("StartTimestamp"));
        let last_line = text.lines().last().unwrap();
        assert_eq!(last_line.matches(',').count(), 3);
    }

    #[test]
    fn csv_header_then_interval_has_no_payload() {
        let mut buf = Vec::new();
        {
            let mut w = IntervalLogWriter::new(&mut buf, true);
            w.write_header(0, 0).unwrap();
            w.write_interval(&sample_interval(), 0, None).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), CSV_LEGEND);
        let interval_line = lines.next().unwrap();
        assert_eq!(interval_line.split(',').count(), 4);
    }
}
