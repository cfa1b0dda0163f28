//! Fixed rate clock.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Timer to synchronize the driver loop with a fixed wall-clock rate.
///
/// It is designed to work with the yielding cooperative pattern
/// of the driver loop. When the VM yields control back to the
/// caller, time elapses until it is resumed. Once the driver
/// is resumed, the elapsed time is taken into account when determining
/// the next cycle.
pub(crate) struct Clock {
    start: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            start: Instant::now(),
            interval,
        }
    }

    pub(crate) fn from_hz(frequency: u64) -> Self {
        Self::new(crate::vm::Hz(frequency).into())
    }

    /// Set the clock state back to zero.
    pub(crate) fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Number of whole intervals elapsed since the last call.
    ///
    /// The clock advances by exactly that many intervals, keeping the
    /// fractional remainder, so a fixed rate is held no matter how often
    /// or how late this is polled. A zero interval always reports one tick.
    pub(crate) fn ticks(&mut self) -> u32 {
        if self.interval.is_zero() {
            self.reset();
            return 1;
        }

        let elapsed = self.start.elapsed().as_nanos();
        let ticks = (elapsed / self.interval.as_nanos()).min(u32::MAX as u128) as u32;
        self.start += self.interval * ticks;
        ticks
    }

    /// Block the current thread until the next clock cycle.
    ///
    /// Unlike [`Clock::ticks`] this resets back to zero rather than trying
    /// to catch up. If the VM was paused, and a large amount of time has
    /// elapsed until it is resumed, it should simply continue at the next
    /// cycle running at its usual speed.
    pub(crate) fn wait(&mut self) {
        loop {
            if self.start.elapsed() < self.interval {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                self.reset();
                return;
            }
        }
    }
}
