//! Linear backoff.

use std::time::Duration;

/// Delay before retry `attempt` (1-based): `attempt × factor`.
///
/// Attempt 0 is the original request and never waits.
pub fn calculate_backoff(attempt: u32, factor: Duration) -> Duration {
    factor.saturating_mul(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let factor = Duration::from_millis(1000);
        assert_eq!(calculate_backoff(0, factor), Duration::ZERO);
        assert_eq!(calculate_backoff(1, factor), Duration::from_secs(1));
        assert_eq!(calculate_backoff(2, factor), Duration::from_secs(2));
        assert_eq!(calculate_backoff(3, factor), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_saturates() {
        let huge = calculate_backoff(u32::MAX, Duration::MAX);
        assert_eq!(huge, Duration::MAX);
    }
}
