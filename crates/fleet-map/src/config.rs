use std::env;
use std::str::FromStr;

use chrono::TimeDelta;
use realtime::GeoPoint;

/// Stroke styling for trails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailStyle {
    /// Opacity of the recent (or only) segment.
    pub opacity: f32,

    /// Fraction of `opacity` used for the older segment.
    pub faded_ratio: f32,
}

impl Default for TrailStyle {
    fn default() -> Self {
        Self { opacity: 0.8, faded_ratio: 0.3 }
    }
}

/// Map presentation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub show_trails: bool,
    pub trail: TrailStyle,
    pub single_point_zoom: u8,

    /// Live positions older than this are badged stale and left out of
    /// fleet statistics.
    pub stale_after: TimeDelta,

    /// Initial map center, and the anchor for placeholder positions.
    pub center: GeoPoint,

    /// Radius, in degrees, of the circle placeholders are spread on.
    pub placeholder_radius: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            show_trails: true,
            trail: TrailStyle::default(),
            single_point_zoom: 15,
            stale_after: TimeDelta::minutes(5),
            center: GeoPoint::new(14.5995, 120.9842),
            placeholder_radius: 0.001,
        }
    }
}

impl MapConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let opacity = env_parse::<f32>("TRAIL_OPACITY")
            .filter(|opacity| (0.0..=1.0).contains(opacity))
            .unwrap_or(defaults.trail.opacity);
        let stale_after = env_parse::<i64>("STALE_AFTER_SECS")
            .filter(|secs| *secs > 0)
            .map_or(defaults.stale_after, TimeDelta::seconds);
        let center = match (env_parse::<f64>("MAP_CENTER_LAT"), env_parse::<f64>("MAP_CENTER_LNG")) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng),
            _ => defaults.center,
        };

        Self {
            show_trails: env_flag("SHOW_TRAILS").unwrap_or(defaults.show_trails),
            trail: TrailStyle { opacity, ..defaults.trail },
            single_point_zoom: env_parse("SINGLE_POINT_ZOOM").unwrap_or(defaults.single_point_zoom),
            stale_after,
            center,
            ..defaults
        }
    }
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = env::var(key).ok()?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(key = key, value = %value, error = %err, "ignoring invalid setting");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key = key, value = %value, "ignoring invalid flag");
            None
        }
    }
}
