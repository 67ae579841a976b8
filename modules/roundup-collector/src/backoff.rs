//! Exponential backoff for rate-limited fetches.
//!
//! `delay(n) = min(base * 2^n + jitter, cap)` where jitter is uniform in
//! `[0, jitter_max]`. The RNG is passed in so tests can seed it.

use std::time::Duration;

use rand::Rng;

use roundup_common::CollectorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub jitter_max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration, jitter_max: Duration) -> Self {
        Self {
            base,
            cap,
            jitter_max,
        }
    }

    pub fn from_settings(settings: &CollectorSettings) -> Self {
        Self::new(
            settings.backoff_base,
            settings.backoff_cap,
            settings.backoff_jitter,
        )
    }

    /// `min(base * 2^attempt, cap)`, saturating instead of overflowing.
    pub fn delay_without_jitter(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.cap)
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn delay<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = if self.jitter_max.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.random_range(0..=self.jitter_max.as_millis() as u64))
        };
        self.delay_without_jitter(attempt)
            .saturating_add(jitter)
            .min(self.cap)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_settings(&CollectorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn defaults_match_collector_settings() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base, Duration::from_secs(30));
        assert_eq!(policy.cap, Duration::from_secs(900));
        assert_eq!(policy.jitter_max, Duration::from_secs(5));
    }

    #[test]
    fn doubles_per_attempt_until_cap() {
        let policy = BackoffPolicy::default();
        let secs: Vec<u64> = (1..=6)
            .map(|n| policy.delay_without_jitter(n).as_secs())
            .collect();
        assert_eq!(secs, vec![60, 120, 240, 480, 900, 900]);
    }

    #[test]
    fn delay_stays_within_bounds() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=20 {
            for _ in 0..50 {
                let d = policy.delay(n, &mut rng);
                assert!(d <= policy.cap, "attempt {n}: {d:?} exceeds cap");
                assert!(
                    d >= policy.delay_without_jitter(n),
                    "attempt {n}: {d:?} below unjittered floor"
                );
                assert!(d <= policy.delay_without_jitter(n) + policy.jitter_max);
            }
        }
    }

    #[test]
    fn unjittered_delay_is_non_decreasing() {
        let policy = BackoffPolicy::new(
            Duration::from_millis(250),
            Duration::from_secs(60),
            Duration::ZERO,
        );
        let mut rng = StdRng::seed_from_u64(0);
        let mut previous = Duration::ZERO;
        for n in 1..=64 {
            let d = policy.delay(n, &mut rng);
            assert!(d >= previous);
            previous = d;
        }
        assert_eq!(previous, Duration::from_secs(60));
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let policy = BackoffPolicy::default();
        let a: Vec<Duration> = {
            let mut rng = StdRng::seed_from_u64(42);
            (1..=5).map(|n| policy.delay(n, &mut rng)).collect()
        };
        let b: Vec<Duration> = {
            let mut rng = StdRng::seed_from_u64(42);
            (1..=5).map(|n| policy.delay(n, &mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn huge_attempt_saturates_to_cap() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_without_jitter(u32::MAX), policy.cap);
    }
}
