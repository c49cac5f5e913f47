use realtime::{GeoPoint, Geocoder};
use tracing::debug;

/// Human readable description of `point`. Falls back to the formatted
/// coordinate when the lookup fails or yields nothing.
pub async fn describe_location(geocoder: &impl Geocoder, point: GeoPoint) -> String {
    match geocoder.reverse(point.lat, point.lng).await {
        Ok(address) if !address.trim().is_empty() => address,
        Ok(_) => {
            debug!(lat = point.lat, lng = point.lng, "no address found; using coordinates");
            format_coordinate(point)
        }
        Err(err) => {
            debug!(lat = point.lat, lng = point.lng, error = %err, "reverse geocoding failed; using coordinates");
            format_coordinate(point)
        }
    }
}

/// `"lat, lng"` to six decimal places.
#[must_use]
pub fn format_coordinate(point: GeoPoint) -> String {
    format!("{:.6}, {:.6}", point.lat, point.lng)
}
