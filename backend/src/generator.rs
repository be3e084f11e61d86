//! Waypoint proposals for the two route shapes.
//!
//! # Loop strategy
//! Waypoints sit on a circle of `radius` around the origin, spread over a
//! 120° arc centred on a base angle that rotates with every attempt:
//!
//! ```text
//! base_angle = attempt_index · 360 / max_attempts
//! loop       = origin → w₁ → … → wₙ → origin
//! ```
//!
//! The radius starts from a size-tiered fraction of the target and is then
//! corrected from the distance the oracle actually reported.
//!
//! # Point-to-point strategy
//! A fixed grid of twelve bearings crossed with five distance multipliers,
//! walked bearing-major. Each cell becomes a two-point request.

use rand::Rng;

use crate::{
    config::SearchConfig,
    geo::{destination, normalize_bearing},
    models::Coordinate,
    search::SearchState,
};

const LOOP_ARC_DEG: f64 = 120.0;
const GROW_FACTOR: f64 = 1.18;
const SHRINK_FACTOR: f64 = 0.86;
const DAMPING_SLOPE: f64 = 0.4;
const MIN_DAMPING: f64 = 0.75;

pub const GRID_BEARINGS: usize = 12;
pub const GRID_MULTIPLIERS: [f64; 5] = [0.7, 0.85, 1.0, 1.15, 1.3];
const GRID_JITTER_DEG: f64 = 10.0;

/// Size-dependent loop parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTier {
    pub waypoint_count: usize,
    pub radius_factor: f64,
    /// Fraction over target above which a candidate is discarded unscored.
    pub bail_over: f64,
}

impl LoopTier {
    pub fn for_target(target_km: f64) -> Self {
        if target_km <= 8.0 {
            Self {
                waypoint_count: 2,
                radius_factor: 0.20,
                bail_over: 0.40,
            }
        } else if target_km <= 20.0 {
            Self {
                waypoint_count: 3,
                radius_factor: 0.22,
                bail_over: 0.35,
            }
        } else {
            Self {
                waypoint_count: 3,
                radius_factor: 0.24,
                bail_over: 0.30,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopStrategy {
    origin: Coordinate,
    target_km: f64,
    tier: LoopTier,
    max_attempts: usize,
    radius_min_km: f64,
    radius_max_km: f64,
    max_jitter_deg: f64,
}

impl LoopStrategy {
    /// `target_km` must already be clamped.
    pub fn new(origin: Coordinate, target_km: f64, config: &SearchConfig) -> Self {
        Self {
            origin,
            target_km,
            tier: LoopTier::for_target(target_km),
            max_attempts: config.max_attempts.max(1),
            radius_min_km: config.radius_min_km,
            radius_max_km: config.radius_max_km,
            max_jitter_deg: config.max_jitter_deg,
        }
    }

    pub fn tier(&self) -> LoopTier {
        self.tier
    }

    pub fn initial_radius(&self) -> f64 {
        (self.target_km * self.tier.radius_factor).clamp(self.radius_min_km, self.radius_max_km)
    }

    /// Distance above which a candidate is not worth scoring.
    pub fn bail_over_km(&self) -> f64 {
        self.target_km * (1.0 + self.tier.bail_over)
    }

    pub fn base_angle(&self, attempt_index: usize) -> f64 {
        normalize_bearing(attempt_index as f64 * 360.0 / self.max_attempts as f64)
    }

    /// Closed waypoint sequence for the attempt described by `state`.
    pub fn propose<R: Rng + ?Sized>(&self, state: &SearchState, rng: &mut R) -> Vec<Coordinate> {
        let count = self.tier.waypoint_count;
        let base = self.base_angle(state.attempt_index);
        let step = if count > 1 {
            LOOP_ARC_DEG / (count - 1) as f64
        } else {
            0.0
        };
        let first_offset = -LOOP_ARC_DEG / 2.0;

        let mut waypoints = Vec::with_capacity(count + 2);
        waypoints.push(self.origin);
        for i in 0..count {
            let jitter = rng.gen_range(-self.max_jitter_deg..=self.max_jitter_deg);
            let heading = normalize_bearing(base + first_offset + step * i as f64 + jitter);
            waypoints.push(destination(self.origin, heading, state.radius));
        }
        waypoints.push(self.origin);
        waypoints
    }

    /// Damped multiplicative correction towards the target, clamped to the radius bounds.
    pub fn adapt_radius(&self, radius: f64, actual_km: f64) -> f64 {
        let ratio_off = (actual_km - self.target_km).abs() / self.target_km;
        let damp = (1.0 - ratio_off * DAMPING_SLOPE).clamp(MIN_DAMPING, 1.0);
        let factor = if actual_km < self.target_km {
            1.0 + (GROW_FACTOR - 1.0) * damp
        } else {
            1.0 - (1.0 - SHRINK_FACTOR) * damp
        };
        (radius * factor).clamp(self.radius_min_km, self.radius_max_km)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub bearing_deg: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct PointToPointStrategy {
    origin: Coordinate,
    target_km: f64,
    detour_factor: f64,
}

impl PointToPointStrategy {
    /// `target_km` must already be clamped.
    pub fn new(origin: Coordinate, target_km: f64, config: &SearchConfig) -> Self {
        Self {
            origin,
            target_km,
            detour_factor: config.detour_factor,
        }
    }

    pub fn grid() -> impl Iterator<Item = GridCell> {
        (0..GRID_BEARINGS).flat_map(|b| {
            GRID_MULTIPLIERS.iter().map(move |&multiplier| GridCell {
                bearing_deg: b as f64 * 360.0 / GRID_BEARINGS as f64,
                multiplier,
            })
        })
    }

    /// Straight-line distance to project so the walked route lands near
    /// `target · multiplier`.
    pub fn projection_km(&self, multiplier: f64) -> f64 {
        self.target_km * multiplier / self.detour_factor
    }

    pub fn propose<R: Rng + ?Sized>(&self, cell: GridCell, rng: &mut R) -> Vec<Coordinate> {
        let jitter = rng.gen_range(-GRID_JITTER_DEG..=GRID_JITTER_DEG);
        let heading = normalize_bearing(cell.bearing_deg + jitter);
        vec![
            self.origin,
            destination(self.origin, heading, self.projection_km(cell.multiplier)),
        ]
    }
}
