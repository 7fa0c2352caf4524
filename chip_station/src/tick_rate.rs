// THEORY:
// A rolling tick rate for the operator. Each tick records the time since the
// previous one; the rate is the mean of the per-tick rates over the last
// `WINDOW` ticks, so a single stall does not dominate the figure for long.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const WINDOW: usize = 30;

#[derive(Debug, Default)]
pub struct TickRate {
    last: Option<Instant>,
    rates: VecDeque<f64>,
}

impl TickRate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last {
            self.push(now.saturating_duration_since(last));
        }
        self.last = Some(now);
    }

    fn push(&mut self, elapsed: Duration) {
        if elapsed.is_zero() {
            return;
        }
        if self.rates.len() == WINDOW {
            self.rates.pop_front();
        }
        self.rates.push_back(1.0 / elapsed.as_secs_f64());
    }

    /// Ticks per second over the window, `None` before the second tick.
    pub fn per_second(&self) -> Option<f64> {
        if self.rates.is_empty() {
            return None;
        }
        Some(self.rates.iter().sum::<f64>() / self.rates.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_two_ticks() {
        let mut rate = TickRate::new();
        assert_eq!(rate.per_second(), None);
        rate.record(Instant::now());
        assert_eq!(rate.per_second(), None);
    }

    #[test]
    fn averages_over_the_window() {
        let start = Instant::now();
        let mut rate = TickRate::new();
        rate.record(start);
        rate.record(start + Duration::from_millis(50));
        rate.record(start + Duration::from_millis(150));
        // 20/s and 10/s.
        let fps = rate.per_second().unwrap();
        assert!((fps - 15.0).abs() < 1e-9);

        let mut at = start + Duration::from_millis(150);
        for _ in 0..WINDOW {
            at += Duration::from_millis(25);
            rate.record(at);
        }
        let fps = rate.per_second().unwrap();
        assert!((fps - 40.0).abs() < 1e-6);
    }

    #[test]
    fn ignores_repeated_instants() {
        let start = Instant::now();
        let mut rate = TickRate::new();
        rate.record(start);
        rate.record(start);
        assert_eq!(rate.per_second(), None);
    }
}
