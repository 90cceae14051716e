//! Bounded fixed-interval polling.
//!
//! Waiting is routed through [`Clock`] so every suspension point can be
//! exercised in tests without real delays.
use anyhow::Result;
use std::time::Duration;

/// Source of blocking waits.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Pending,
    Ready(T),
}

/// Result of a whole polling sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    /// Every attempt returned [`Probe::Pending`].
    Exhausted { attempts: u32 },
}

/// Runs a probe up to `attempts` times, sleeping `interval` between
/// consecutive attempts. There is no sleep after the final attempt.
pub struct Poller<'a, C: Clock + ?Sized> {
    clock: &'a C,
    attempts: u32,
    interval: Duration,
}

impl<'a, C: Clock + ?Sized> Poller<'a, C> {
    pub fn new(clock: &'a C, attempts: u32, interval: Duration) -> Self {
        Self {
            clock,
            attempts,
            interval,
        }
    }

    /// Drive `probe` (called with the 1-indexed attempt number) until it is
    /// ready. A probe error ends polling immediately.
    pub fn run<T>(&self, mut probe: impl FnMut(u32) -> Result<Probe<T>>) -> Result<PollOutcome<T>> {
        for attempt in 1..=self.attempts {
            if let Probe::Ready(value) = probe(attempt)? {
                return Ok(PollOutcome::Ready(value));
            }
            if attempt < self.attempts {
                self.clock.sleep(self.interval);
            }
        }
        Ok(PollOutcome::Exhausted {
            attempts: self.attempts,
        })
    }
}

#[cfg(test)]
pub use fake_clock::FakeClock;


#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
