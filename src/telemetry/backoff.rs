use std::time::Duration;

/// Adaptive retry pacing for null telemetry reads.
///
/// The transport degrades (and has been observed to crash) under request
/// bursts, so this is a resource-protection mechanism first and a
/// reliability mechanism second. Within a miss streak the interval widens
/// quadratically in the consecutive-miss count above a fixed base, capped
/// at `max_ms`; each successful read narrows the carried base by a fixed
/// decrement, floored at `min_ms`.
#[derive(Debug, Clone)]
pub struct AdaptiveBackoff {
    base_ms: u64,
    current_ms: u64,
    min_ms: u64,
    max_ms: u64,
    growth_ms: u64,
    decrement_ms: u64,
    misses: u64,
}

impl AdaptiveBackoff {
    pub fn new(min_ms: u64, max_ms: u64, growth_ms: u64, decrement_ms: u64) -> Self {
        Self {
            base_ms: min_ms,
            current_ms: min_ms,
            min_ms,
            max_ms: max_ms.max(min_ms),
            growth_ms,
            decrement_ms,
            misses: 0,
        }
    }

    /// Registers a null read and returns the interval to sleep before the
    /// next attempt. The base stays fixed for the whole streak, so the
    /// widening is quadratic in the streak length rather than cumulative.
    pub fn on_miss(&mut self) -> Duration {
        self.misses += 1;
        let widened = self
            .base_ms
            .saturating_add(self.growth_ms.saturating_mul(self.misses * self.misses));
        self.current_ms = widened.min(self.max_ms);
        Duration::from_millis(self.current_ms)
    }

    /// Registers a resolved read: the carried base steps down once from the
    /// widened interval, floored.
    pub fn on_hit(&mut self) {
        self.misses = 0;
        self.base_ms = self.current_ms.saturating_sub(self.decrement_ms).max(self.min_ms);
        self.current_ms = self.base_ms;
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    pub fn consecutive_misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::AdaptiveBackoff;
    use std::time::Duration;

    #[test]
    fn misses_widen_monotonically_up_to_the_cap() {
        let mut backoff = AdaptiveBackoff::new(10, 500, 5, 20);
        let mut last = Duration::ZERO;
        for _ in 0..20 {
            let interval = backoff.on_miss();
            assert!(interval >= last);
            assert!(interval <= Duration::from_millis(500));
            last = interval;
        }
        assert_eq!(last, Duration::from_millis(500));
    }

    #[test]
    fn a_streak_widens_from_a_fixed_base() {
        let mut backoff = AdaptiveBackoff::new(10, 1000, 5, 2);
        let intervals: Vec<u64> = (0..3).map(|_| backoff.on_miss().as_millis() as u64).collect();
        assert_eq!(intervals, [15, 30, 55]);
    }

    #[test]
    fn one_hit_steps_down_exactly_once_with_floor() {
        let mut backoff = AdaptiveBackoff::new(10, 500, 5, 20);
        for _ in 0..4 {
            backoff.on_miss();
        }
        let widened = backoff.interval();
        backoff.on_hit();
        assert_eq!(backoff.interval(), widened - Duration::from_millis(20));
        assert_eq!(backoff.consecutive_misses(), 0);
        for _ in 0..100 {
            backoff.on_hit();
        }
        assert_eq!(backoff.interval(), Duration::from_millis(10));
    }

    #[test]
    fn miss_count_resets_after_a_hit() {
        let mut backoff = AdaptiveBackoff::new(10, 10_000, 10, 1);
        backoff.on_miss();
        backoff.on_miss();
        backoff.on_hit();
        // First miss after a hit widens by growth * 1^2 again, not by the
        // previous streak's square.
        let before = backoff.interval();
        let after = backoff.on_miss();
        assert_eq!(after, before + Duration::from_millis(10));
    }
}
