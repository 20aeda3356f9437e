//! Monotonic timestamps for the sampling hot path.
//!
//! `std::time::Instant` is monotonic but does not expose a raw nanosecond integer, so the
//! sampler talks to `CLOCK_MONOTONIC` directly, the same way a syscall-level crate would.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{Error, Result};

/// Monotonically non-decreasing nanosecond clock, plus a wall-clock reading for log annotations.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock
    }

    /// Nanoseconds since an unspecified epoch, monotonically non-decreasing.
    ///
    /// Fails only if the host has no `CLOCK_MONOTONIC` source, which this tool does not support.
    pub fn now_ns(&self) -> Result<u64> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            return Err(Error::Clock(format!(
                "clock_gettime(CLOCK_MONOTONIC) failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        Ok(ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64)
    }

    /// Milliseconds since the Unix epoch. For log annotation only; never used for measurement.
    pub fn wall_ms(&self) -> i64 {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch");
        since_epoch.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ns_is_non_decreasing() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns().unwrap();
        let b = clock.now_ns().unwrap();
        assert!(b >= a);
    }

    #[test]
    fn wall_ms_is_plausible() {
        let clock = MonotonicClock::new();
        // any timestamp well after this crate was written
        assert!(clock.wall_ms() > 1_700_000_000_000);
    }
}
