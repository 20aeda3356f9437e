//! The file-ingestion sampler (§4.3.2): replays a timestamped latency stream through the same
//! coordinated-omission correction used by `LiveSampler`, with optional gap-filling
//! (`fill_zeros`). Writes go through a `LocalRecorder` rather than `HistogramRecorder`, since the
//! sampler and its `HistogramHub` share one thread here (see `histogram::recorder` module docs).
//!
//! Unlike `LiveSampler`, `FileSampler::advance_to` is driven synchronously on the caller's
//! thread and its deadlines are in the input file's own millisecond timeline, not wall/monotonic
//! nanoseconds (§4.4 step 2's file-mode carve-out).

use std::io::BufRead;

use log::warn;

use crate::histogram::LocalRecorder;
use crate::sampling::AdvanceOutcome;

pub struct FileSampler {
    lines: Box<dyn Iterator<Item = std::io::Result<String>>>,
    recorder: LocalRecorder,
    resolution_ns: u64,
    resolution_ms: f64,
    fill_zeros: bool,
    prev_ts_ms: f64,
    buffered: Option<(f64, f64)>,
    terminated: bool,
    reported_after_terminate: bool,
}

impl FileSampler {
    pub fn new<R: BufRead + 'static>(
        reader: R,
        resolution_ns: u64,
        fill_zeros: bool,
        recorder: LocalRecorder,
    ) -> FileSampler {
        FileSampler {
            lines: Box::new(reader.lines()),
            recorder,
            resolution_ns,
            resolution_ms: (resolution_ns as f64 / 1_000_000.0).max(0.0),
            fill_zeros,
            prev_ts_ms: 0.0,
            buffered: None,
            terminated: false,
            reported_after_terminate: false,
        }
    }

    /// Consumes input lines until the first line's timestamp reaches `start_delay_ms`, used by
    /// the orchestrator's warm-up step for file sources (§4.7).
    pub fn skip_until(&mut self, start_delay_ms: f64) {
        loop {
            if self.buffer_next_line().is_none() {
                return;
            }
            let (ts_ms, _) = self.buffered.unwrap();
            if ts_ms >= start_delay_ms {
                self.prev_ts_ms = start_delay_ms;
                return;
            }
            self.buffered = None;
        }
    }

    pub fn advance_to(&mut self, deadline_ms_u: u64) -> AdvanceOutcome {
        if self.terminated {
            return self.terminal_outcome(deadline_ms_u);
        }
        let deadline_ms = deadline_ms_u as f64;
        loop {
            if self.buffered.is_none() && self.buffer_next_line().is_none() {
                self.terminated = true;
                break;
            }
            let (ts_ms, latency_ms) = self.buffered.unwrap();
            if ts_ms < self.prev_ts_ms {
                // time must be non-decreasing; treat as end-of-input
                self.terminated = true;
                break;
            }

            let msec_preceding_ms = if self.fill_zeros {
                ts_ms - latency_ms.ceil()
            } else {
                ts_ms
            };

            if deadline_ms < msec_preceding_ms {
                if self.fill_zeros {
                    self.bulk_record_zeros(self.prev_ts_ms, deadline_ms);
                }
                self.prev_ts_ms = deadline_ms;
                return AdvanceOutcome::ReachedDeadline(deadline_ms_u);
            }

            if msec_preceding_ms >= self.prev_ts_ms {
                if self.fill_zeros {
                    self.bulk_record_zeros(self.prev_ts_ms, msec_preceding_ms);
                }
                let value_ns = (latency_ms * 1_000_000.0).round().max(0.0) as u64;
                if let Err(e) = self.recorder.record(value_ns, self.resolution_ns) {
                    warn!("failed to record file-sourced sample: {}", e);
                }
                self.prev_ts_ms = ts_ms;
            }
            self.buffered = None;
        }

        self.terminal_outcome(deadline_ms_u)
    }

    fn terminal_outcome(&mut self, deadline_ms_u: u64) -> AdvanceOutcome {
        if self.reported_after_terminate {
            return AdvanceOutcome::Terminated;
        }
        self.reported_after_terminate = true;
        let deadline_ms = deadline_ms_u as f64;
        if self.fill_zeros && deadline_ms > self.prev_ts_ms {
            self.bulk_record_zeros(self.prev_ts_ms, deadline_ms);
            self.prev_ts_ms = deadline_ms;
        }
        AdvanceOutcome::ReachedDeadline(deadline_ms_u)
    }

    fn bulk_record_zeros(&mut self, from_ms: f64, to_ms: f64) {
        if self.resolution_ms <= 0.0 || to_ms <= from_ms {
            return;
        }
        let ticks = ((to_ms - from_ms) / self.resolution_ms).floor() as u64;
        if ticks == 0 {
            return;
        }
        if let Err(e) = self.recorder.record_count(0, ticks) {
            warn!("failed to zero-fill {} ticks: {}", ticks, e);
        }
    }

    fn buffer_next_line(&mut self) -> Option<()> {
        loop {
            let line = self.lines.next()?;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("input stream read error, treating as end-of-input: {}", e);
                    return None;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match parse_input_line(trimmed) {
                Some(parsed) => {
                    self.buffered = Some(parsed);
                    return Some(());
                }
                None => {
                    warn!("unparseable input line, treating as end-of-input: {:?}", line);
                    return None;
                }
            }
        }
    }
}

/// Parses `"<ts_ms> <latency_ms>"`. Fails soft: any malformed line is a caller-visible `None`,
/// which the sampler treats as end-of-input (§7 `InputFormatError`).
fn parse_input_line(line: &str) -> Option<(f64, f64)> {
    let mut parts = line.split_whitespace();
    let ts_ms: f64 = parts.next()?.parse().ok()?;
    let latency_ms: f64 = parts.next()?.parse().ok()?;
    if latency_ms < 0.0 {
        return None;
    }
    Some((ts_ms, latency_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramHub;
    use std::io::Cursor;

    fn sampler(input: &str, resolution_ns: u64, fill_zeros: bool) -> (FileSampler, HistogramHub) {
        let (hub, recorder) =
            HistogramHub::new_local(1, 30 * 24 * 3_600 * 1_000_000_000u64, 2).unwrap();
        let reader = Cursor::new(input.as_bytes().to_vec());
        let sampler = FileSampler::new(reader, resolution_ns, fill_zeros, recorder);
        (sampler, hub)
    }

    #[test]
    fn parses_well_formed_lines() {
        assert_eq!(parse_input_line("1 2.5"), Some((1.0, 2.5)));
        assert_eq!(parse_input_line("not-a-number 2"), None);
        assert_eq!(parse_input_line("1"), None);
    }

    #[test]
    fn latency_interpretation_records_the_sample_in_its_own_interval() {
        // S3: lines at t=0,1,2,3 with latencies 0,0,50,0 ms; resolution 1ms.
        let (mut sampler, mut hub) = sampler("0 0\n1 0\n2 50\n3 0\n", 1_000_000, false);
        let outcome = sampler.advance_to(4);
        assert!(matches!(outcome, AdvanceOutcome::ReachedDeadline(_)));
        let ih = hub.swap_interval(0, 4);
        // 4 real samples plus coordinated-omission backfill for the 50ms one (49 extra steps of 1ms)
        assert!(ih.total_count() >= 4);
        assert_eq!(ih.max(), 50_000_000);
    }

    #[test]
    fn fill_zeros_covers_the_gaps_between_events() {
        let (mut sampler, mut hub) = sampler("0 0\n1 0\n2 50\n3 0\n", 1_000_000, true);
        let _ = sampler.advance_to(4);
        let ih = hub.swap_interval(0, 4);
        assert!(ih.total_count() > 4);
    }

    #[test]
    fn non_monotonic_timestamps_terminate_input_cleanly() {
        let (mut sampler, _hub) = sampler("5 0\n1 0\n", 1_000_000, false);
        let _ = sampler.advance_to(10);
        let second = sampler.advance_to(20);
        assert!(matches!(second, AdvanceOutcome::Terminated));
    }

    #[test]
    fn repeated_advance_after_eof_is_idempotent() {
        let (mut sampler, _hub) = sampler("0 0\n", 1_000_000, false);
        let first = sampler.advance_to(100);
        let second = sampler.advance_to(100);
        assert!(matches!(first, AdvanceOutcome::ReachedDeadline(_)));
        assert!(matches!(second, AdvanceOutcome::Terminated));
    }
}
