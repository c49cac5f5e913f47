use std::time::Duration;

/// Exponential backoff applied after unclean closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect `attempt` (1-based): `base * 2^(attempt-1)`
    /// capped at `max_delay`. `None` once attempts are exhausted.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1_u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> =
            (1..=10).map(|attempt| policy.delay(attempt).unwrap().as_secs()).collect();

        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30, 30, 30]);
        assert_eq!(policy.delay(11), None);
        assert_eq!(policy.delay(0), None);
    }

    #[test]
    fn large_attempts_saturate() {
        let policy = ReconnectPolicy { max_attempts: u32::MAX, ..ReconnectPolicy::default() };
        assert_eq!(policy.delay(64), Some(Duration::from_secs(30)));
    }
}
