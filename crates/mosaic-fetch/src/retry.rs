use std::time::Duration;

/// Delay before retry attempt `retry_count` (0-indexed) using exponential
/// backoff: `base * 2^retry_count`, saturating on overflow.
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(retry_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_retry() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(0, base), Duration::from_millis(100));
        assert_eq!(retry_delay(1, base), Duration::from_millis(200));
        assert_eq!(retry_delay(2, base), Duration::from_millis(400));
        assert_eq!(retry_delay(3, base), Duration::from_millis(800));
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(retry_delay(10, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let base = Duration::from_secs(u64::MAX / 2);
        assert!(retry_delay(40, base) > Duration::ZERO);
    }
}
