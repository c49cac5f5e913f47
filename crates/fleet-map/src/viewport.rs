use realtime::GeoPoint;
use serde::Serialize;

/// Axis-aligned box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl Bounds {
    fn around(first: GeoPoint) -> Self {
        Self { south_west: first, north_east: first }
    }

    fn extend(&mut self, point: GeoPoint) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }

    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            f64::midpoint(self.south_west.lat, self.north_east.lat),
            f64::midpoint(self.south_west.lng, self.north_east.lng),
        )
    }
}

/// Viewport command issued to the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Viewport {
    /// Leave the view where it is.
    Unchanged,
    Center { point: GeoPoint, zoom: u8 },
    Fit { bounds: Bounds },
}

/// Frame `points`, ignoring the `(0, 0)` sentinel.
#[must_use]
pub fn frame(points: impl IntoIterator<Item = GeoPoint>, single_point_zoom: u8) -> Viewport {
    let mut points = points.into_iter().filter(|point| !point.is_sentinel());

    let Some(first) = points.next() else {
        return Viewport::Unchanged;
    };
    let mut bounds = Bounds::around(first);
    let mut count = 1_usize;
    for point in points {
        bounds.extend(point);
        count += 1;
    }

    if count == 1 {
        Viewport::Center { point: first, zoom: single_point_zoom }
    } else {
        Viewport::Fit { bounds }
    }
}
