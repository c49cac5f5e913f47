use std::env;
use std::str::FromStr;

use fleet_map::MapConfig;
use location_feed::FeedConfig;
use location_history::DEFAULT_CAPACITY;

/// How positions reach the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedMode {
    /// Socket connection kept alive by the connection manager.
    #[default]
    Push,

    /// REST endpoint fetched on an interval.
    Poll,
}

impl FromStr for FeedMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "poll" => Ok(Self::Poll),
            other => Err(format!("unknown feed mode `{other}`")),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mode: FeedMode,
    pub feed_url: String,
    pub poll_url: String,

    /// E-mail registered with the push server on connect.
    pub identity: String,
    pub history_capacity: usize,

    /// Reverse geocoding endpoint. Without one, locations are described by
    /// their coordinates.
    pub geocoder_url: Option<String>,
    pub feed: FeedConfig,
    pub map: MapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: FeedMode::default(),
            feed_url: "http://localhost:3001".to_string(),
            poll_url: "http://localhost:3000/api/locations/latest".to_string(),
            identity: String::new(),
            history_capacity: DEFAULT_CAPACITY,
            geocoder_url: None,
            feed: FeedConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration from the environment. Unset or invalid values
    /// fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mode = env::var("FEED_MODE").ok().map_or(defaults.mode, |value| {
            value.parse().unwrap_or_else(|err: String| {
                tracing::warn!(error = %err, "ignoring FEED_MODE");
                defaults.mode
            })
        });
        let history_capacity = env::var("HISTORY_CAPACITY")
            .ok()
            .and_then(|value| match value.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => Some(capacity),
                _ => {
                    tracing::warn!(value = %value, "ignoring HISTORY_CAPACITY");
                    None
                }
            })
            .unwrap_or(defaults.history_capacity);

        Self {
            mode,
            feed_url: env_or("FEED_URL", defaults.feed_url),
            poll_url: env_or("POLL_URL", defaults.poll_url),
            identity: env_or("FEED_IDENTITY", defaults.identity),
            history_capacity,
            geocoder_url: env::var("GEOCODER_URL")
                .ok()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            feed: FeedConfig::from_env(),
            map: MapConfig::from_env(),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or_else(|_| {
        tracing::trace!("{key} not set, using default: {default}");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode() {
        assert_eq!("push".parse::<FeedMode>(), Ok(FeedMode::Push));
        assert_eq!(" POLL ".parse::<FeedMode>(), Ok(FeedMode::Poll));
        assert!("carrier-pigeon".parse::<FeedMode>().is_err());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.feed.reconnect.max_attempts, 10);
        assert_eq!(config.map.single_point_zoom, 15);
        assert!(config.geocoder_url.is_none());
    }
}
