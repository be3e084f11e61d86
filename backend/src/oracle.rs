//! The routing oracle: anything that turns an ordered list of waypoints into
//! a walkable [`RouteCandidate`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Coordinate, RouteCandidate, TravelProfile};

/// Closed set of ways an oracle call can fail.
///
/// `RateLimited` is the only variant the search treats specially: it aborts
/// the whole search. The others only mean "this candidate produced no data".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("routing oracle unavailable: {0}")]
    Unavailable(String),
    #[error("routing oracle is rate limiting requests")]
    RateLimited,
    #[error("routing oracle returned malformed data: {0}")]
    Malformed(String),
}

impl OracleError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// Trait for routing backends.
///
/// # Contract
/// Implementations must:
/// - Return `Malformed` when fewer than two waypoints are supplied
/// - Visit the waypoints in order; for loops the caller repeats the origin last
/// - Return a candidate with `distance_km > 0` and `duration_sec >= 0`
/// - Signal throttling with [`OracleError::RateLimited`], never as `Unavailable`
#[async_trait]
pub trait RouteOracle: Send + Sync {
    async fn route(
        &self,
        waypoints: &[Coordinate],
        profile: TravelProfile,
    ) -> Result<RouteCandidate, OracleError>;
}

#[async_trait]
impl<T: RouteOracle + ?Sized> RouteOracle for &T {
    async fn route(
        &self,
        waypoints: &[Coordinate],
        profile: TravelProfile,
    ) -> Result<RouteCandidate, OracleError> {
        (**self).route(waypoints, profile).await
    }
}

#[async_trait]
impl<T: RouteOracle + ?Sized> RouteOracle for Arc<T> {
    async fn route(
        &self,
        waypoints: &[Coordinate],
        profile: TravelProfile,
    ) -> Result<RouteCandidate, OracleError> {
        (**self).route(waypoints, profile).await
    }
}
