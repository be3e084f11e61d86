use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use routeflow::{
    config::SearchConfig,
    create_router,
    engine::RouteEngine,
    error::RouteError,
    geocode::{GeocodeCache, NominatimResolver, DEFAULT_NOMINATIM_URL},
    oracle::RouteOracle,
    search::AdaptiveSearch,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SAMPLE_GRAPH_PATH: &str = "backend/data/sample_graph.json";

#[derive(Debug, Parser)]
#[command(author, version, about = "Serve distance-matched running routes over HTTP")]
struct Args {
    /// Walkable graph JSON used as the routing oracle
    #[arg(long, env = "GRAPH_JSON", default_value = SAMPLE_GRAPH_PATH)]
    graph: PathBuf,

    #[arg(long, env = "ROUTEFLOW_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Base URL of a Nominatim-compatible geocoder
    #[arg(long, env = "NOMINATIM_URL", default_value = DEFAULT_NOMINATIM_URL)]
    nominatim_url: String,

    /// Loop attempt budget per search
    #[arg(long, env = "ROUTEFLOW_MAX_ATTEMPTS", default_value_t = 12)]
    max_attempts: usize,

    /// Pause between oracle calls, in milliseconds
    #[arg(long, env = "ROUTEFLOW_PACING_MS", default_value_t = 150)]
    pacing_ms: u64,

    #[arg(long, env = "ROUTEFLOW_SEARCH_TIMEOUT_SECS", default_value_t = 30)]
    search_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routeflow=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let engine = RouteEngine::from_file(&args.graph).map_err(RouteError::from)?;
    tracing::info!(
        "loaded routing graph from {} ({} nodes)",
        args.graph.display(),
        engine.node_count()
    );

    let config = SearchConfig {
        max_attempts: args.max_attempts.max(1),
        pacing: Duration::from_millis(args.pacing_ms),
        ..SearchConfig::default()
    };
    let oracle: Arc<dyn RouteOracle> = Arc::new(engine);
    let resolver = NominatimResolver::new(args.nominatim_url).map_err(RouteError::from)?;

    let state = AppState {
        search: Arc::new(AdaptiveSearch::new(oracle, config)),
        geocoder: Arc::new(GeocodeCache::new(Arc::new(resolver))),
        search_timeout: Duration::from_secs(args.search_timeout_secs),
    };
    let app = create_router(state);

    tracing::info!("starting routeflow on http://{}", args.addr);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
