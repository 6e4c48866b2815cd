//! Polynomial backoff, ported from the source's
//! `backoff.NewPolynomialBackoff(time.Second, time.Minute*2, bf.NoJitter, time.Second, []float64{0.5, 2, 2.5}, ...)`.

use std::time::Duration;

const COEFFICIENTS: [f64; 3] = [0.5, 2.0, 2.5];
const BASE: Duration = Duration::from_secs(1);
const MIN: Duration = Duration::from_secs(1);
const MAX: Duration = Duration::from_secs(120);

/// Per-peer backoff state. A fresh instance starts at attempt 0; each `delay()` call
/// advances the attempt counter. `reset()` (called from `PeerSet::done`) zeroes it.
#[derive(Clone, Debug, Default)]
pub struct PolynomialBackoff {
    attempt: u32,
}

impl PolynomialBackoff {
    pub fn new() -> Self {
        Self { attempt: 0 }
    }

    /// Computes the next delay and advances the internal attempt counter.
    pub fn delay(&mut self) -> Duration {
        let n = self.attempt as f64;
        let factor: f64 = COEFFICIENTS
            .iter()
            .enumerate()
            .map(|(i, c)| c * n.powi(i as i32))
            .sum::<f64>()
            .max(0.0);
        self.attempt += 1;
        let millis = (BASE.as_millis() as f64) * factor.max(1.0);
        let computed = Duration::from_millis(millis as u64);
        computed.clamp(MIN, MAX)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_at_least_the_minimum() {
        let mut b = PolynomialBackoff::new();
        for _ in 0..5 {
            assert!(b.delay() >= MIN);
        }
    }

    #[test]
    fn delay_never_exceeds_the_ceiling() {
        let mut b = PolynomialBackoff::new();
        for _ in 0..1000 {
            assert!(b.delay() <= MAX);
        }
    }

    #[test]
    fn reset_returns_to_the_initial_delay() {
        let mut b = PolynomialBackoff::new();
        let first = b.delay();
        b.delay();
        b.delay();
        b.reset();
        assert_eq!(b.delay(), first);
    }
}
