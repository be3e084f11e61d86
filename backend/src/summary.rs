//! Human-facing summaries of an accepted route.

use crate::{
    geo::{bearing, compass_point, haversine_km},
    models::{Coordinate, RouteCandidate},
};
use shared::RouteSummary;

/// `"1h 5m"` above an hour, `"42m"` below.
pub fn format_duration(seconds: f64) -> String {
    let total_minutes = (seconds.max(0.0) / 60.0).round() as u64;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// General direction of a route, taken from the origin to its farthest point.
pub fn direction_hint(origin: Coordinate, path: &[Coordinate]) -> String {
    let farthest = path.iter().copied().max_by(|a, b| {
        haversine_km(origin, *a)
            .partial_cmp(&haversine_km(origin, *b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    match farthest {
        Some(point) if haversine_km(origin, point) > 0.0 => {
            format!("heads {}", compass_point(bearing(origin, point)))
        }
        _ => "stays close to the start".to_string(),
    }
}

pub fn summarize(origin: Coordinate, candidate: &RouteCandidate) -> RouteSummary {
    RouteSummary {
        path: candidate.coordinates.clone(),
        distance_km: candidate.distance_km,
        duration_sec: candidate.duration_sec,
        estimated_time: format_duration(candidate.duration_sec),
        direction_hint: direction_hint(origin, &candidate.coordinates),
        instructions: candidate.instructions.clone(),
    }
}
