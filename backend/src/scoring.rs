//! Route quality score. Lower is better.
//!
//! ```text
//! score = 120 · |distance − target| / target + 2.2 · turns + 12 · u_turns
//! ```
//!
//! Distance accuracy dominates; u-turns cost the most among the shape signals
//! because they mark a doubled-back route. A u-turn also counts as a turn.

use crate::models::{RouteCandidate, TurnInstruction};

pub const DISTANCE_WEIGHT: f64 = 120.0;
pub const TURN_WEIGHT: f64 = 2.2;
pub const U_TURN_WEIGHT: f64 = 12.0;

/// `|actual − target| / target`.
pub fn deviation_ratio(actual_km: f64, target_km: f64) -> f64 {
    (actual_km - target_km).abs() / target_km
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    Straight,
    Turn,
    UTurn,
}

impl Maneuver {
    /// Classify an instruction from its leading verb, so street names such
    /// as "Turnpike Lane" do not count as maneuvers.
    pub fn classify(text: &str) -> Self {
        const U_TURN_PREFIXES: [&str; 3] = ["make a u-turn", "u-turn", "uturn"];
        const TURN_PREFIXES: [&str; 4] = ["turn", "keep", "bear", "sharp"];

        let text = text.trim().to_lowercase();
        if U_TURN_PREFIXES.iter().any(|p| text.starts_with(p)) {
            Self::UTurn
        } else if TURN_PREFIXES.iter().any(|p| text.starts_with(p)) {
            Self::Turn
        } else {
            Self::Straight
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManeuverCounts {
    pub turns: usize,
    pub u_turns: usize,
}

impl ManeuverCounts {
    pub fn from_instructions(instructions: &[TurnInstruction]) -> Self {
        instructions
            .iter()
            .fold(Self::default(), |mut counts, instruction| {
                match Maneuver::classify(&instruction.text) {
                    Maneuver::Straight => {}
                    Maneuver::Turn => counts.turns += 1,
                    Maneuver::UTurn => {
                        counts.turns += 1;
                        counts.u_turns += 1;
                    }
                }
                counts
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteScorer {
    pub distance_weight: f64,
    pub turn_weight: f64,
    pub u_turn_weight: f64,
}

impl Default for RouteScorer {
    fn default() -> Self {
        Self {
            distance_weight: DISTANCE_WEIGHT,
            turn_weight: TURN_WEIGHT,
            u_turn_weight: U_TURN_WEIGHT,
        }
    }
}

impl RouteScorer {
    pub fn score(&self, candidate: &RouteCandidate, target_km: f64) -> f64 {
        let counts = ManeuverCounts::from_instructions(&candidate.instructions);
        self.score_parts(candidate.distance_km, target_km, counts)
    }

    pub fn score_parts(&self, distance_km: f64, target_km: f64, counts: ManeuverCounts) -> f64 {
        self.distance_weight * deviation_ratio(distance_km, target_km)
            + self.turn_weight * counts.turns as f64
            + self.u_turn_weight * counts.u_turns as f64
    }
}
