use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `true` when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelProfile {
    #[default]
    Foot,
    Hike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    #[default]
    Loop,
    PointToPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnInstruction {
    pub text: String,
    pub distance_meters: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text place name, resolved through the geocoder when `origin` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Coordinate>,
    /// Requested distance; a missing value is rejected as invalid input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_km: Option<f64>,
    #[serde(default)]
    pub profile: TravelProfile,
    #[serde(default)]
    pub route_type: RouteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Accepted,
    FallbackAccepted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub duration_sec: f64,
    pub estimated_time: String,
    pub direction_hint: String,
    pub instructions: Vec<TurnInstruction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub target_km: f64,
    pub route: RouteSummary,
    pub gpx_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<GeocodeResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

impl GeocodeResult {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    /// `true` when the same request may succeed later (rate limiting, timeouts).
    #[serde(default)]
    pub retry_later: bool,
}
