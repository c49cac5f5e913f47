use realtime::{GeoPoint, LocationSample};
use serde::Serialize;

use crate::config::TrailStyle;

/// Histories at least this long are drawn with a faded tail.
const FADE_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stroke {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailSegment {
    pub points: Vec<GeoPoint>,
    pub opacity: f32,
    pub stroke: Stroke,
}

/// Polyline drawn behind an entity's marker, oldest segment first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trail {
    pub entity_id: String,
    pub segments: Vec<TrailSegment>,
}

/// Build the trail for a history in append order. Sentinel samples are
/// skipped. Fewer than two points draw nothing; ten or more are split into
/// an older dashed, faded segment over the first 70% and a solid segment
/// over the last 70%.
#[must_use]
pub fn build_trail<'a>(
    entity_id: &str, history: impl IntoIterator<Item = &'a LocationSample>, style: &TrailStyle,
) -> Option<Trail> {
    let points: Vec<GeoPoint> = history
        .into_iter()
        .filter(|sample| !sample.is_sentinel())
        .map(LocationSample::point)
        .collect();

    if points.len() < 2 {
        return None;
    }

    let segments = if points.len() < FADE_THRESHOLD {
        vec![TrailSegment { points, opacity: style.opacity, stroke: Stroke::Solid }]
    } else {
        let span = points.len() * 7 / 10;
        let older = points[..span].to_vec();
        let recent = points[points.len() - span..].to_vec();
        vec![
            TrailSegment {
                points: older,
                opacity: style.opacity * style.faded_ratio,
                stroke: Stroke::Dashed,
            },
            TrailSegment { points: recent, opacity: style.opacity, stroke: Stroke::Solid },
        ]
    };

    Some(Trail { entity_id: entity_id.to_string(), segments })
}
