use serde::{Deserialize, Serialize};

pub use shared::{Coordinate, GeocodeResult, RouteType, TravelProfile, TurnInstruction};

/// What the caller asks the search for. `target_km` is clamped by the
/// controller before any waypoint is generated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub origin: Coordinate,
    pub target_km: f64,
    pub profile: TravelProfile,
    pub route_type: RouteType,
}

/// A walkable route returned by an oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub coordinates: Vec<Coordinate>,
    pub distance_km: f64,
    pub duration_sec: f64,
    pub instructions: Vec<TurnInstruction>,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: RouteCandidate,
    pub score: f64,
}
