use std::thread;
use std::time::{Duration, Instant};

/// How much of a precise wait is spent spinning instead of sleeping.
///
/// OS sleeps routinely overshoot by tens of microseconds; the final stretch is
/// burned on the CPU so sub-millisecond push periods stay accurate.
pub const SPIN_MARGIN: Duration = Duration::from_micros(200);

/// Monotonic clock abstraction for timing across the stack.
///
/// - now(): returns a monotonic Instant
/// - sleep(): coarse sleep for the provided duration
/// - wait_precise(): high-precision wait, used by the periodic push loop
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Wait for `d` with spin-level precision.
    fn wait_precise(&self, d: Duration) {
        let deadline = self.now() + d;
        if let Some(coarse) = d.checked_sub(SPIN_MARGIN) {
            self.sleep(coarse);
        }
        while self.now() < deadline {
            std::hint::spin_loop();
        }
    }

    /// Microseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn us_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_micros()).unwrap_or(u64::MAX)
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}
