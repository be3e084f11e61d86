use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::RouteError;
use crate::models::{Coordinate, RouteCandidate};

/// Encode a candidate as a base64 GPX 1.1 document with one track.
pub fn encode_candidate_as_gpx(candidate: &RouteCandidate, name: &str) -> Result<String, RouteError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("routeflow".into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(name.to_string()),
        description: Some(format!("{:.2} km", candidate.distance_km)),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    segment
        .points
        .extend(candidate.coordinates.iter().map(to_waypoint));
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}
