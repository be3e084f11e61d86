use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use rand::{rngs::StdRng, SeedableRng};
use routeflow::{
    config::SearchConfig,
    engine::RouteEngine,
    error::RouteError,
    geocode::{GeocodeCache, NominatimResolver, DEFAULT_NOMINATIM_URL},
    models::{Coordinate, RouteType, SearchParameters, TravelProfile},
    search::{AdaptiveSearch, SearchOutcome},
    summary::summarize,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shape {
    Loop,
    PointToPoint,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Profile {
    Foot,
    Hike,
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Search one distance-matched route against a graph file and print it as JSON"
)]
struct Args {
    /// Walkable graph JSON used as the routing oracle
    #[arg(long, env = "GRAPH_JSON")]
    graph: PathBuf,

    /// Requested distance in kilometres
    #[arg(long)]
    km: f64,

    #[arg(long, requires = "lon", conflicts_with = "location")]
    lat: Option<f64>,
    #[arg(long, requires = "lat")]
    lon: Option<f64>,

    /// Free-text start location, resolved through Nominatim
    #[arg(long)]
    location: Option<String>,

    #[arg(long, env = "NOMINATIM_URL", default_value = DEFAULT_NOMINATIM_URL)]
    nominatim_url: String,

    #[arg(long, value_enum, default_value_t = Shape::Loop)]
    shape: Shape,

    #[arg(long, value_enum, default_value_t = Profile::Foot)]
    profile: Profile,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 12)]
    max_attempts: usize,

    /// Pause between oracle calls, in milliseconds
    #[arg(long, default_value_t = 0)]
    pacing_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let origin = match (args.lat, args.lon, args.location.as_deref()) {
        (Some(lat), Some(lon), _) => Coordinate::new(lat, lon),
        (_, _, Some(location)) => {
            let resolver = NominatimResolver::new(args.nominatim_url.clone())?;
            let cache = GeocodeCache::new(Arc::new(resolver));
            let place = cache.resolve(location).await.map_err(RouteError::from)?;
            tracing::info!("resolved {location:?} to {}", place.display_name);
            place.coordinate()
        }
        _ => return Err("either --lat/--lon or --location is required".into()),
    };

    let engine = RouteEngine::from_file(&args.graph).map_err(RouteError::from)?;
    let config = SearchConfig {
        max_attempts: args.max_attempts.max(1),
        pacing: Duration::from_millis(args.pacing_ms),
        ..SearchConfig::default()
    };
    let search = AdaptiveSearch::new(engine, config);

    let params = SearchParameters {
        origin,
        target_km: args.km,
        profile: match args.profile {
            Profile::Foot => TravelProfile::Foot,
            Profile::Hike => TravelProfile::Hike,
        },
        route_type: match args.shape {
            Shape::Loop => RouteType::Loop,
            Shape::PointToPoint => RouteType::PointToPoint,
        },
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (status, candidate) = match search.search(&params, &mut rng).await {
        SearchOutcome::Accepted(candidate) => ("accepted", candidate),
        SearchOutcome::FallbackAccepted(candidate) => ("fallback_accepted", candidate),
        SearchOutcome::Failed(failure) => return Err(failure.into()),
    };

    let output = serde_json::json!({
        "status": status,
        "route": summarize(origin, &candidate),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
