//! Adaptive distance-matching route search.
//!
//! # Control loop
//!
//! ```text
//! Idle → Attempting(i) ─┬─ within tolerance ──────────→ Accepted
//!                       ├─ over bail-over / no data ──→ Attempting(i+1)
//!                       ├─ scored miss (adapt radius) → Attempting(i+1)
//!                       ├─ oracle rate limited ───────→ Failed(OracleRateLimited)
//!                       └─ budget spent ──→ FallbackAccepted | Failed(NoAcceptableRoute)
//! ```
//!
//! Attempts are strictly sequential and paced by a [`PacingPolicy`]. A
//! rate-limited search never falls back to its best candidate: it stopped
//! with incomplete information.

use rand::Rng;

use crate::{
    config::{FixedPacing, PacingPolicy, SearchConfig},
    generator::{LoopStrategy, PointToPointStrategy},
    models::{Coordinate, RouteCandidate, RouteType, ScoredCandidate, SearchParameters},
    oracle::RouteOracle,
    scoring::{deviation_ratio, RouteScorer},
};

/// Per-invocation search state. Created at search start, discarded on return.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub attempt_index: usize,
    pub radius: f64,
    pub best: Option<ScoredCandidate>,
}

impl SearchState {
    pub fn new(radius: f64) -> Self {
        Self {
            attempt_index: 0,
            radius,
            best: None,
        }
    }

    /// Keep `candidate` if it beats the current best.
    pub fn offer(&mut self, candidate: RouteCandidate, score: f64) {
        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| score < best.score);
        if improves {
            self.best = Some(ScoredCandidate { candidate, score });
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchFailure {
    #[error("invalid search parameters: {0}")]
    InvalidParameters(String),
    #[error("routing service is rate limiting requests, try again later")]
    OracleRateLimited,
    #[error("no route close to the requested distance was found, try a different start or distance")]
    NoAcceptableRoute,
}

impl SearchFailure {
    /// `true` when the same input may succeed later; `false` when the input should change.
    pub fn retry_later(&self) -> bool {
        matches!(self, Self::OracleRateLimited)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Accepted(RouteCandidate),
    /// Best candidate after the whole budget, within the looser fallback tolerance.
    FallbackAccepted(RouteCandidate),
    Failed(SearchFailure),
}

impl SearchOutcome {
    pub fn into_result(self) -> Result<RouteCandidate, SearchFailure> {
        match self {
            Self::Accepted(candidate) | Self::FallbackAccepted(candidate) => Ok(candidate),
            Self::Failed(failure) => Err(failure),
        }
    }

    pub fn candidate(&self) -> Option<&RouteCandidate> {
        match self {
            Self::Accepted(candidate) | Self::FallbackAccepted(candidate) => Some(candidate),
            Self::Failed(_) => None,
        }
    }
}

pub struct AdaptiveSearch<O, P = FixedPacing> {
    oracle: O,
    config: SearchConfig,
    pacing: P,
    scorer: RouteScorer,
}

impl<O: RouteOracle> AdaptiveSearch<O, FixedPacing> {
    pub fn new(oracle: O, config: SearchConfig) -> Self {
        let pacing = FixedPacing::from(&config);
        Self::with_pacing(oracle, config, pacing)
    }
}

impl<O: RouteOracle, P: PacingPolicy> AdaptiveSearch<O, P> {
    pub fn with_pacing(oracle: O, config: SearchConfig, pacing: P) -> Self {
        Self {
            oracle,
            config,
            pacing,
            scorer: RouteScorer::default(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run one search. `rng` drives the waypoint jitter; seed it for reproducible runs.
    pub async fn search<R: Rng + Send>(
        &self,
        params: &SearchParameters,
        rng: &mut R,
    ) -> SearchOutcome {
        let target_km = match self.validate(params) {
            Ok(target_km) => target_km,
            Err(failure) => return SearchOutcome::Failed(failure),
        };
        if target_km != params.target_km {
            tracing::debug!(
                "Clamped target {:.2}km to {:.2}km",
                params.target_km,
                target_km
            );
        }

        let result = match params.route_type {
            RouteType::Loop => self.search_loop(params, target_km, rng).await,
            RouteType::PointToPoint => self.search_point_to_point(params, target_km, rng).await,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(failure) => SearchOutcome::Failed(failure),
        };
        match &outcome {
            SearchOutcome::Accepted(c) => tracing::info!(
                "Search accepted {:.2}km route (target {:.2}km)",
                c.distance_km,
                target_km
            ),
            SearchOutcome::FallbackAccepted(c) => tracing::info!(
                "Search fell back to best {:.2}km route (target {:.2}km)",
                c.distance_km,
                target_km
            ),
            SearchOutcome::Failed(failure) => tracing::info!("Search failed: {failure}"),
        }
        outcome
    }

    /// Check a requested distance and clamp it into the supported range.
    pub fn validate_target(&self, target_km: f64) -> Result<f64, SearchFailure> {
        if !target_km.is_finite() || target_km <= 0.0 {
            return Err(SearchFailure::InvalidParameters(format!(
                "target distance must be a positive number of kilometres, got {target_km}"
            )));
        }
        Ok(self.config.clamp_target(target_km))
    }

    fn validate(&self, params: &SearchParameters) -> Result<f64, SearchFailure> {
        let target_km = self.validate_target(params.target_km)?;
        if !params.origin.is_valid() {
            return Err(SearchFailure::InvalidParameters(format!(
                "origin ({}, {}) is not a valid coordinate",
                params.origin.lat, params.origin.lon
            )));
        }
        Ok(target_km)
    }

    async fn search_loop<R: Rng + Send>(
        &self,
        params: &SearchParameters,
        target_km: f64,
        rng: &mut R,
    ) -> Result<SearchOutcome, SearchFailure> {
        let strategy = LoopStrategy::new(params.origin, target_km, &self.config);
        let mut state = SearchState::new(strategy.initial_radius());

        tracing::info!(
            "Loop search: target {:.1}km, {} waypoints, radius {:.2}km, {} attempts",
            target_km,
            strategy.tier().waypoint_count,
            state.radius,
            self.config.max_attempts
        );

        for attempt_index in 0..self.config.max_attempts {
            state.attempt_index = attempt_index;
            self.pace(attempt_index).await;

            let waypoints = strategy.propose(&state, rng);
            let Some(candidate) = self.attempt(&state, &waypoints, params).await? else {
                continue;
            };

            let distance_km = candidate.distance_km;
            if distance_km > strategy.bail_over_km() {
                tracing::debug!(
                    "Attempt {}: discarded {:.2}km, over ceiling {:.2}km",
                    attempt_index + 1,
                    distance_km,
                    strategy.bail_over_km()
                );
                continue;
            }

            let ratio = deviation_ratio(distance_km, target_km);
            let tolerance = self.config.stage_tolerance(attempt_index);
            let score = self.scorer.score(&candidate, target_km);
            tracing::debug!(
                "Attempt {}: {:.2}km at radius {:.2}km, off {:.1}% (tolerance {:.0}%), score {:.1}",
                attempt_index + 1,
                distance_km,
                state.radius,
                ratio * 100.0,
                tolerance * 100.0,
                score
            );

            if ratio <= tolerance {
                return Ok(SearchOutcome::Accepted(candidate));
            }

            state.offer(candidate, score);
            state.radius = strategy.adapt_radius(state.radius, distance_km);
        }

        Ok(self.fall_back(state, target_km))
    }

    async fn search_point_to_point<R: Rng + Send>(
        &self,
        params: &SearchParameters,
        target_km: f64,
        rng: &mut R,
    ) -> Result<SearchOutcome, SearchFailure> {
        let strategy = PointToPointStrategy::new(params.origin, target_km, &self.config);
        let mut state = SearchState::new(0.0);

        tracing::info!("Point-to-point search: target {:.1}km", target_km);

        for (attempt_index, cell) in PointToPointStrategy::grid().enumerate() {
            state.attempt_index = attempt_index;
            self.pace(attempt_index).await;

            let waypoints = strategy.propose(cell, rng);
            let Some(candidate) = self.attempt(&state, &waypoints, params).await? else {
                continue;
            };

            let ratio = deviation_ratio(candidate.distance_km, target_km);
            let score = self.scorer.score(&candidate, target_km);
            tracing::debug!(
                "Attempt {} (bearing {:.0}°, ×{:.2}): {:.2}km, off {:.1}%, score {:.1}",
                attempt_index + 1,
                cell.bearing_deg,
                cell.multiplier,
                candidate.distance_km,
                ratio * 100.0,
                score
            );

            if ratio <= self.config.point_to_point_tolerance {
                return Ok(SearchOutcome::Accepted(candidate));
            }
            state.offer(candidate, score);
        }

        Ok(self.fall_back(state, target_km))
    }

    /// One oracle call. `Ok(None)` means the attempt produced no usable data.
    async fn attempt(
        &self,
        state: &SearchState,
        waypoints: &[Coordinate],
        params: &SearchParameters,
    ) -> Result<Option<RouteCandidate>, SearchFailure> {
        match self.oracle.route(waypoints, params.profile).await {
            Ok(candidate) if candidate.distance_km.is_finite() && candidate.distance_km > 0.0 => {
                Ok(Some(candidate))
            }
            Ok(candidate) => {
                tracing::warn!(
                    "Attempt {}: oracle returned unusable distance {}",
                    state.attempt_index + 1,
                    candidate.distance_km
                );
                Ok(None)
            }
            Err(err) if err.is_rate_limited() => {
                tracing::warn!(
                    "Attempt {}: oracle rate limited, aborting search",
                    state.attempt_index + 1
                );
                Err(SearchFailure::OracleRateLimited)
            }
            Err(err) => {
                tracing::warn!("Attempt {}: {err}", state.attempt_index + 1);
                Ok(None)
            }
        }
    }

    async fn pace(&self, attempt_index: usize) {
        let delay = self.pacing.delay(attempt_index);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn fall_back(&self, state: SearchState, target_km: f64) -> SearchOutcome {
        match state.best {
            Some(best)
                if deviation_ratio(best.candidate.distance_km, target_km)
                    <= self.config.fallback_tolerance =>
            {
                SearchOutcome::FallbackAccepted(best.candidate)
            }
            _ => SearchOutcome::Failed(SearchFailure::NoAcceptableRoute),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        geo::{haversine_km, path_length_km},
        models::{TravelProfile, TurnInstruction},
        oracle::OracleError,
    };

    type Reply = Result<f64, OracleError>;

    /// Replays scripted distances, then repeats `fallback` forever.
    struct ScriptedOracle {
        script: Mutex<VecDeque<Reply>>,
        fallback: Reply,
        calls: AtomicUsize,
        requests: Mutex<Vec<Vec<Coordinate>>>,
    }

    impl ScriptedOracle {
        fn new(script: Vec<Reply>, fallback: Reply) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn always(distance_km: f64) -> Self {
            Self::new(Vec::new(), Ok(distance_km))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn requests(&self) -> Vec<Vec<Coordinate>> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn candidate(waypoints: &[Coordinate], distance_km: f64) -> RouteCandidate {
        RouteCandidate {
            coordinates: waypoints.to_vec(),
            distance_km,
            duration_sec: distance_km * 720.0,
            instructions: Vec::new(),
        }
    }

    #[async_trait]
    impl RouteOracle for ScriptedOracle {
        async fn route(
            &self,
            waypoints: &[Coordinate],
            _profile: TravelProfile,
        ) -> Result<RouteCandidate, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(waypoints.to_vec());
            let reply = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            reply.map(|distance_km| candidate(waypoints, distance_km))
        }
    }

    /// Walked distance is the straight-line distance times the detour factor.
    struct DetourOracle {
        detour_factor: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RouteOracle for DetourOracle {
        async fn route(
            &self,
            waypoints: &[Coordinate],
            _profile: TravelProfile,
        ) -> Result<RouteCandidate, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let distance_km = path_length_km(waypoints) * self.detour_factor;
            Ok(candidate(waypoints, distance_km))
        }
    }

    fn origin() -> Coordinate {
        Coordinate::new(51.505, -0.09)
    }

    fn params(target_km: f64, route_type: RouteType) -> SearchParameters {
        SearchParameters {
            origin: origin(),
            target_km,
            profile: TravelProfile::Foot,
            route_type,
        }
    }

    fn config(max_attempts: usize) -> SearchConfig {
        SearchConfig {
            max_attempts,
            pacing: Duration::ZERO,
            ..SearchConfig::default()
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[tokio::test]
    async fn loop_accepts_first_close_match() {
        let oracle = ScriptedOracle::always(5.2);
        let search = AdaptiveSearch::new(&oracle, config(12));

        let outcome = search.search(&params(5.0, RouteType::Loop), &mut rng()).await;

        assert!(matches!(outcome, SearchOutcome::Accepted(ref c) if c.distance_km == 5.2));
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn loop_discards_every_overlong_candidate() {
        let oracle = ScriptedOracle::always(8.0);
        let search = AdaptiveSearch::new(&oracle, config(12));

        let outcome = search.search(&params(5.0, RouteType::Loop), &mut rng()).await;

        assert_eq!(outcome, SearchOutcome::Failed(SearchFailure::NoAcceptableRoute));
        assert_eq!(oracle.calls(), 12);
    }

    #[tokio::test]
    async fn discarded_candidates_leave_radius_untouched() {
        let oracle = ScriptedOracle::always(8.0);
        let search = AdaptiveSearch::new(&oracle, config(4));

        let _ = search.search(&params(5.0, RouteType::Loop), &mut rng()).await;

        let radii: Vec<f64> = oracle
            .requests()
            .iter()
            .map(|waypoints| haversine_km(origin(), waypoints[1]))
            .collect();
        for radius in &radii {
            assert!((radius - radii[0]).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn rate_limit_aborts_without_fallback() {
        // attempt 2 is a 15% near miss that the fallback tolerance would accept
        let oracle = ScriptedOracle::new(
            vec![Ok(7.0), Ok(11.5), Err(OracleError::RateLimited)],
            Ok(10.0),
        );
        let search = AdaptiveSearch::new(
            &oracle,
            SearchConfig {
                stage_tolerances: [0.05, 0.05, 0.05],
                ..config(10)
            },
        );

        let outcome = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        assert_eq!(outcome, SearchOutcome::Failed(SearchFailure::OracleRateLimited));
        assert_eq!(oracle.calls(), 3);
        assert!(SearchFailure::OracleRateLimited.retry_later());
        assert!(OracleError::RateLimited.is_rate_limited());
        assert!(!OracleError::Unavailable("timeout".into()).is_rate_limited());
    }

    #[tokio::test]
    async fn unavailable_and_malformed_responses_are_absorbed() {
        let oracle = ScriptedOracle::new(
            vec![
                Err(OracleError::Unavailable("timeout".into())),
                Err(OracleError::Malformed("no routes".into())),
                Ok(0.0),
            ],
            Ok(5.1),
        );
        let search = AdaptiveSearch::new(&oracle, config(12));

        let outcome = search.search(&params(5.0, RouteType::Loop), &mut rng()).await;

        assert!(matches!(outcome, SearchOutcome::Accepted(_)));
        assert_eq!(oracle.calls(), 4);
    }

    #[tokio::test]
    async fn tolerance_tightens_across_the_budget() {
        // 15% off passes the first stage (18%) but not the middle one (12%)
        let oracle = ScriptedOracle::new(vec![Ok(13.0), Ok(13.0), Ok(13.0)], Ok(11.5));
        let search = AdaptiveSearch::new(&oracle, config(9));

        let outcome = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        // attempts 4..=9 are in the 12% and 8% stages, so the 15% miss only survives as a fallback
        assert!(matches!(outcome, SearchOutcome::FallbackAccepted(ref c) if c.distance_km == 11.5));
        assert_eq!(oracle.calls(), 9);
    }

    #[tokio::test]
    async fn later_stage_accepts_tighter_match() {
        let oracle = ScriptedOracle::new(vec![Ok(13.0), Ok(13.0), Ok(13.0)], Ok(11.0));
        let search = AdaptiveSearch::new(&oracle, config(9));

        let outcome = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        assert!(matches!(outcome, SearchOutcome::Accepted(ref c) if c.distance_km == 11.0));
        assert_eq!(oracle.calls(), 4);
    }

    #[tokio::test]
    async fn fallback_keeps_best_scored_candidate() {
        let oracle = ScriptedOracle::new(vec![Ok(7.9), Ok(12.0), Ok(8.1)], Ok(13.4));
        let search = AdaptiveSearch::new(&oracle, config(6));

        let outcome = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        // 8.1 km is 19% off, the closest of the lot and inside the 22% fallback
        assert!(matches!(outcome, SearchOutcome::FallbackAccepted(ref c) if c.distance_km == 8.1));
    }

    #[tokio::test]
    async fn fallback_rejects_best_outside_tolerance() {
        let oracle = ScriptedOracle::always(12.5);
        let search = AdaptiveSearch::new(&oracle, config(6));

        let outcome = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        assert_eq!(outcome, SearchOutcome::Failed(SearchFailure::NoAcceptableRoute));
        assert!(!SearchFailure::NoAcceptableRoute.retry_later());
    }

    #[tokio::test]
    async fn radius_grows_after_short_loops() {
        let oracle = ScriptedOracle::always(6.0);
        let search = AdaptiveSearch::new(&oracle, config(5));

        let _ = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        let radii: Vec<f64> = oracle
            .requests()
            .iter()
            .map(|waypoints| haversine_km(origin(), waypoints[1]))
            .collect();
        assert_eq!(radii.len(), 5);
        assert!(radii.windows(2).all(|w| w[1] > w[0]));
    }

    #[tokio::test]
    async fn loop_requests_are_closed() {
        let oracle = ScriptedOracle::always(30.0);
        let search = AdaptiveSearch::new(&oracle, config(3));

        let _ = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        for waypoints in oracle.requests() {
            assert!(waypoints.len() >= 2);
            assert_eq!(waypoints.first(), waypoints.last());
        }
    }

    #[tokio::test]
    async fn point_to_point_exits_on_exact_multiplier() {
        let oracle = DetourOracle {
            detour_factor: SearchConfig::default().detour_factor,
            calls: AtomicUsize::new(0),
        };
        let search = AdaptiveSearch::new(&oracle, config(12));

        let outcome = search
            .search(&params(10.0, RouteType::PointToPoint), &mut rng())
            .await;

        let route = outcome.into_result().expect("accepted");
        assert!((route.distance_km - 10.0).abs() < 1e-6);
        // ×0.7 and ×0.85 miss, ×1.0 on the first bearing hits
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn point_to_point_walks_whole_grid_then_falls_back() {
        let oracle = ScriptedOracle::new(vec![Ok(12.0), Ok(8.3)], Ok(30.0));
        let search = AdaptiveSearch::new(&oracle, config(12));

        let outcome = search
            .search(&params(10.0, RouteType::PointToPoint), &mut rng())
            .await;

        assert!(matches!(outcome, SearchOutcome::FallbackAccepted(ref c) if c.distance_km == 8.3));
        assert_eq!(oracle.calls(), 60);
    }

    #[tokio::test]
    async fn point_to_point_rate_limit_stops_the_grid() {
        let oracle = ScriptedOracle::new(vec![Ok(30.0), Err(OracleError::RateLimited)], Ok(10.0));
        let search = AdaptiveSearch::new(&oracle, config(12));

        let outcome = search
            .search(&params(10.0, RouteType::PointToPoint), &mut rng())
            .await;

        assert_eq!(outcome, SearchOutcome::Failed(SearchFailure::OracleRateLimited));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn rejects_non_positive_targets_before_calling_oracle() {
        let oracle = ScriptedOracle::always(5.0);
        let search = AdaptiveSearch::new(&oracle, config(12));

        for target in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let outcome = search.search(&params(target, RouteType::Loop), &mut rng()).await;
            assert!(matches!(
                outcome,
                SearchOutcome::Failed(SearchFailure::InvalidParameters(_))
            ));
        }
        assert_eq!(oracle.calls(), 0);
    }

    #[test]
    fn validate_target_rejects_and_clamps() {
        let search = AdaptiveSearch::new(ScriptedOracle::always(5.0), config(12));

        assert_eq!(search.validate_target(8.0), Ok(8.0));
        assert_eq!(search.validate_target(500.0), Ok(60.0));
        assert_eq!(search.validate_target(0.2), Ok(1.0));
        for target in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                search.validate_target(target),
                Err(SearchFailure::InvalidParameters(_))
            ));
        }
    }

    #[tokio::test]
    async fn rejects_invalid_origin() {
        let oracle = ScriptedOracle::always(5.0);
        let search = AdaptiveSearch::new(&oracle, config(12));
        let mut request = params(5.0, RouteType::Loop);
        request.origin = Coordinate::new(95.0, 0.0);

        let outcome = search.search(&request, &mut rng()).await;

        assert!(matches!(
            outcome,
            SearchOutcome::Failed(SearchFailure::InvalidParameters(_))
        ));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_target_is_clamped_before_projection() {
        let oracle = ScriptedOracle::always(500.0);
        let cfg = config(12);
        let search = AdaptiveSearch::new(&oracle, cfg.clone());

        let _ = search
            .search(&params(500.0, RouteType::PointToPoint), &mut rng())
            .await;

        let farthest = cfg.max_target_km * 1.3 / cfg.detour_factor;
        let requests = oracle.requests();
        assert_eq!(requests.len(), 60);
        for waypoints in requests {
            assert!(haversine_km(origin(), waypoints[1]) <= farthest + 1e-6);
        }
    }

    #[tokio::test]
    async fn undersized_target_is_clamped_before_projection() {
        let oracle = ScriptedOracle::always(1.05);
        let search = AdaptiveSearch::new(&oracle, config(12));

        let outcome = search.search(&params(0.2, RouteType::Loop), &mut rng()).await;

        // 1.05 km is 5% off the clamped 1 km target, but 425% off 0.2 km
        assert!(matches!(outcome, SearchOutcome::Accepted(_)));
        let requests = oracle.requests();
        let radius = haversine_km(origin(), requests[0][1]);
        assert!((radius - SearchConfig::default().radius_min_km).abs() < 1e-6);
    }

    #[tokio::test]
    async fn same_seed_reproduces_requests() {
        let first = ScriptedOracle::always(30.0);
        let second = ScriptedOracle::always(30.0);

        let _ = AdaptiveSearch::new(&first, config(4))
            .search(&params(10.0, RouteType::Loop), &mut rng())
            .await;
        let _ = AdaptiveSearch::new(&second, config(4))
            .search(&params(10.0, RouteType::Loop), &mut rng())
            .await;

        assert_eq!(first.requests(), second.requests());
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_paced() {
        let oracle = ScriptedOracle::new(vec![Ok(30.0), Ok(30.0)], Err(OracleError::RateLimited));
        let search = AdaptiveSearch::new(
            &oracle,
            SearchConfig {
                pacing: Duration::from_millis(150),
                ..SearchConfig::default()
            },
        );

        let started = tokio::time::Instant::now();
        let _ = search.search(&params(10.0, RouteType::Loop), &mut rng()).await;

        assert_eq!(oracle.calls(), 3);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn state_offer_keeps_lowest_score() {
        let mut state = SearchState::new(1.0);
        state.offer(candidate(&[], 5.0), 10.0);
        state.offer(candidate(&[], 6.0), 12.0);
        state.offer(candidate(&[], 4.0), 3.0);

        let best = state.best.expect("best");
        assert_eq!(best.candidate.distance_km, 4.0);
        assert_eq!(best.score, 3.0);
    }

    #[test]
    fn scorer_prefers_fewer_u_turns_at_equal_distance() {
        let scorer = RouteScorer::default();
        let mut doubled_back = candidate(&[], 5.0);
        doubled_back.instructions.push(TurnInstruction {
            text: "Make a U-turn".into(),
            distance_meters: 300.0,
            street_name: None,
        });
        assert!(scorer.score(&doubled_back, 5.0) > scorer.score(&candidate(&[], 5.0), 5.0));
    }
}
