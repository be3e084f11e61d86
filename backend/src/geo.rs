//! Great-circle helpers on a spherical Earth.
//!
//! All bearings are degrees clockwise from north and all distances are
//! kilometres. Inputs are not validated: non-finite values propagate as NaN.

use crate::models::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Project `distance_km` from `origin` along the initial `bearing_deg`.
pub fn destination(origin: Coordinate, bearing_deg: f64, distance_km: f64) -> Coordinate {
    let angular_distance = distance_km / EARTH_RADIUS_KM;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = f64::asin(
        lat1.sin() * angular_distance.cos() + lat1.cos() * angular_distance.sin() * bearing.cos(),
    );
    let lon2 = lon1
        + f64::atan2(
            bearing.sin() * angular_distance.sin() * lat1.cos(),
            angular_distance.cos() - lat1.sin() * lat2.sin(),
        );

    Coordinate {
        lat: lat2.to_degrees(),
        lon: normalize_longitude(lon2.to_degrees()),
    }
}

/// Initial bearing from `a` towards `b`, in `[0, 360)`.
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_bearing(y.atan2(x).to_degrees())
}

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub fn path_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

pub fn normalize_longitude(lon: f64) -> f64 {
    let mut normalized = lon;
    while normalized < -180.0 {
        normalized += 360.0;
    }
    while normalized > 180.0 {
        normalized -= 360.0;
    }
    normalized
}

pub fn normalize_bearing(bearing_deg: f64) -> f64 {
    let mut value = bearing_deg % 360.0;
    if value < 0.0 {
        value += 360.0;
    }
    // -1e-15 % 360 + 360 rounds to exactly 360.0
    if value >= 360.0 {
        value = 0.0;
    }
    value
}

/// Signed smallest difference `to - from`, in `(-180, 180]`. Positive is clockwise.
pub fn heading_change(from_deg: f64, to_deg: f64) -> f64 {
    let delta = normalize_bearing(to_deg - from_deg);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Eight-wind compass label for a bearing.
pub fn compass_point(bearing_deg: f64) -> &'static str {
    const POINTS: [&str; 8] = [
        "north",
        "north-east",
        "east",
        "south-east",
        "south",
        "south-west",
        "west",
        "north-west",
    ];
    let sector = ((normalize_bearing(bearing_deg) + 22.5) / 45.0).floor() as usize % 8;
    POINTS[sector]
}
