//! Fixed-period stepping decoupled from wall-clock frame time.

use log::debug;
use std::time::Duration;

/// Accumulates elapsed time and converts it into whole simulation steps.
///
/// The remainder smaller than one period is carried into the next call, so
/// the number of steps over any interval depends only on total elapsed time.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    period: Duration,
    accumulator: Duration,
}

impl FixedTimestep {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_micros(1)),
            accumulator: Duration::ZERO,
        }
    }

    /// Timestep running `rate` steps per second.
    pub fn from_rate(rate: u32) -> Self {
        Self::new(Duration::from_secs(1) / rate.max(1))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time carried over towards the next step.
    pub fn remainder(&self) -> Duration {
        self.accumulator
    }

    /// Add `elapsed` and return how many steps to run now. After a stall
    /// this is the whole backlog; no elapsed time is ever discarded.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let total = self.accumulator + elapsed;
        let period = self.period.as_nanos();
        let steps = total.as_nanos() / period;
        self.accumulator = Duration::from_nanos((total.as_nanos() % period) as u64);

        if steps > 1 {
            debug!("Catching up {} steps", steps);
        }
        u32::try_from(steps).unwrap_or(u32::MAX)
    }

    /// [`advance`](Self::advance) with a frame delta in seconds.
    pub fn advance_secs(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return self.advance(Duration::ZERO);
        }
        self.advance(Duration::from_secs_f32(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rate() {
        let step = FixedTimestep::from_rate(20);
        assert_eq!(step.period(), Duration::from_millis(50));
    }

    #[test]
    fn test_remainder_is_carried() {
        let mut step = FixedTimestep::from_rate(20);
        assert_eq!(step.advance(Duration::from_millis(30)), 0);
        assert_eq!(step.advance(Duration::from_millis(30)), 1);
        assert_eq!(step.remainder(), Duration::from_millis(10));
        assert_eq!(step.advance(Duration::from_millis(140)), 3);
        assert_eq!(step.remainder(), Duration::ZERO);
    }

    #[test]
    fn test_step_count_independent_of_jitter() {
        let mut even = FixedTimestep::from_rate(20);
        let mut jittery = FixedTimestep::from_rate(20);

        let even_steps: u32 = (0..100).map(|_| even.advance(Duration::from_millis(16))).sum();
        let jitter = [3u64, 29, 16, 8, 24];
        let jittery_steps: u32 = (0..100)
            .map(|i| jittery.advance(Duration::from_millis(jitter[i % jitter.len()])))
            .sum();

        // 1600ms at 50ms per step
        assert_eq!(even_steps, 32);
        assert_eq!(jittery_steps, 32);
    }

    #[test]
    fn test_stall_backlog_is_kept() {
        let mut step = FixedTimestep::from_rate(20);
        assert_eq!(step.advance(Duration::from_millis(5_020)), 100);
        assert_eq!(step.remainder(), Duration::from_millis(20));

        // Same total as a smooth run of the same length.
        let mut smooth = FixedTimestep::from_rate(20);
        let steps: u32 = (0..251).map(|_| smooth.advance(Duration::from_millis(20))).sum();
        assert_eq!(steps, 100);
        assert_eq!(smooth.remainder(), step.remainder());
    }

    #[test]
    fn test_advance_secs_ignores_bad_deltas() {
        let mut step = FixedTimestep::from_rate(10);
        assert_eq!(step.advance_secs(-1.0), 0);
        assert_eq!(step.advance_secs(f32::NAN), 0);
        assert_eq!(step.advance_secs(0.25), 2);
    }
}
