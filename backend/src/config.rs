use std::time::Duration;

/// Tunable knobs of the adaptive search. The defaults are the tuned values;
/// only the shape (staged tightening, tiered radius, bail-over ceiling,
/// looser fallback) is load-bearing.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub min_target_km: f64,
    pub max_target_km: f64,
    /// Attempt budget for loop searches. Point-to-point searches walk their grid instead.
    pub max_attempts: usize,
    /// Deviation ratios accepted in the first, middle and final third of the budget.
    pub stage_tolerances: [f64; 3],
    pub point_to_point_tolerance: f64,
    /// Deviation ratio the best candidate must meet once the budget is spent.
    pub fallback_tolerance: f64,
    pub radius_min_km: f64,
    pub radius_max_km: f64,
    pub max_jitter_deg: f64,
    /// Expected ratio of walked distance to straight-line distance.
    pub detour_factor: f64,
    pub pacing: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_target_km: 1.0,
            max_target_km: 60.0,
            max_attempts: 12,
            stage_tolerances: [0.18, 0.12, 0.08],
            point_to_point_tolerance: 0.10,
            fallback_tolerance: 0.22,
            radius_min_km: 0.3,
            radius_max_km: 14.0,
            max_jitter_deg: 25.0,
            detour_factor: 1.25,
            pacing: Duration::from_millis(150),
        }
    }
}

impl SearchConfig {
    pub fn clamp_target(&self, target_km: f64) -> f64 {
        target_km.clamp(self.min_target_km, self.max_target_km)
    }

    /// Acceptance tolerance for a loop attempt. Never loosens as `attempt_index` grows.
    pub fn stage_tolerance(&self, attempt_index: usize) -> f64 {
        let budget = self.max_attempts.max(1);
        let stage = (attempt_index.min(budget - 1) * 3) / budget;
        self.stage_tolerances[stage.min(2)]
    }
}

/// How long to wait before an attempt. Keeps requests to the oracle spaced out.
pub trait PacingPolicy: Send + Sync {
    fn delay(&self, attempt_index: usize) -> Duration;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPacing(pub Duration);

impl PacingPolicy for FixedPacing {
    fn delay(&self, attempt_index: usize) -> Duration {
        if attempt_index == 0 {
            Duration::ZERO
        } else {
            self.0
        }
    }
}

impl From<&SearchConfig> for FixedPacing {
    fn from(config: &SearchConfig) -> Self {
        Self(config.pacing)
    }
}
