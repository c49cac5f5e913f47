use std::env;
use std::time::Duration;

use crate::backoff::ReconnectPolicy;

/// Feed configuration derived from the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub reconnect: ReconnectPolicy,

    /// Interval between keepalive pings; `None` disables keepalive.
    pub keepalive: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            keepalive: Some(Duration::from_secs(25)),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl FeedConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let reconnect = ReconnectPolicy {
            base_delay: env_millis("RECONNECT_BASE_DELAY_MS").unwrap_or(defaults.reconnect.base_delay),
            max_delay: env_millis("RECONNECT_MAX_DELAY_MS").unwrap_or(defaults.reconnect.max_delay),
            max_attempts: env_u64("RECONNECT_MAX_ATTEMPTS")
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(defaults.reconnect.max_attempts),
        };
        let keepalive = match env_u64("KEEPALIVE_INTERVAL_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.keepalive,
        };
        let poll_interval = env_u64("POLL_INTERVAL_SECS")
            .filter(|secs| *secs > 0)
            .map_or(defaults.poll_interval, Duration::from_secs);

        Self { reconnect, keepalive, poll_interval }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let value = env::var(key).ok()?;
    match value.trim().parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(key = key, value = %value, error = %err, "ignoring invalid setting");
            None
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env_u64(key).map(Duration::from_millis)
}
