//! Free-text place resolution and its process-lifetime cache.
//!
//! The cache keys on the trimmed, lowercased query. Only successful
//! resolutions are stored and nothing is ever evicted. Concurrent lookups of
//! the same key share one resolver call.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::models::GeocodeResult;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeocodeError {
    #[error("location query is empty")]
    EmptyQuery,
    #[error("no location matches \"{0}\"")]
    NotFound(String),
    #[error("geocoding service failed: {0}")]
    Service(String),
}

/// Resolves free text to at most one location.
#[async_trait]
pub trait GeocodeResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Option<GeocodeResult>, GeocodeError>;
}

#[async_trait]
impl<T: GeocodeResolver + ?Sized> GeocodeResolver for Arc<T> {
    async fn resolve(&self, query: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
        (**self).resolve(query).await
    }
}

/// Resolver backed by a Nominatim-compatible `/search` endpoint.
pub struct NominatimResolver {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimResolver {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("routeflow/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| GeocodeError::Service(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeocodeResolver for NominatimResolver {
    async fn resolve(&self, query: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("format", "json"), ("limit", "1"), ("q", query)],
        )
        .map_err(|err| GeocodeError::Service(err.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| GeocodeError::Service(err.to_string()))?;
        if !response.status().is_success() {
            return Err(GeocodeError::Service(format!(
                "geocoder answered {}",
                response.status()
            )));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|err| GeocodeError::Service(err.to_string()))?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let lat = place.lat.parse::<f64>();
        let lon = place.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(Some(GeocodeResult {
                lat,
                lon,
                display_name: place.display_name,
            })),
            _ => Err(GeocodeError::Service(format!(
                "unparseable coordinates ({}, {})",
                place.lat, place.lon
            ))),
        }
    }
}

pub fn normalize_key(query: &str) -> String {
    query.trim().to_lowercase()
}

pub struct GeocodeCache {
    resolver: Arc<dyn GeocodeResolver>,
    entries: Mutex<HashMap<String, Arc<OnceCell<GeocodeResult>>>>,
}

impl GeocodeCache {
    pub fn new(resolver: Arc<dyn GeocodeResolver>) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, query: &str) -> Result<GeocodeResult, GeocodeError> {
        let key = normalize_key(query);
        if key.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let cell = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        if let Some(hit) = cell.get() {
            tracing::debug!("Cache hit for geocode: {key}");
            return Ok(hit.clone());
        }

        let result = cell
            .get_or_try_init(|| async {
                tracing::debug!("Cache miss for geocode: {key}. Calling resolver.");
                self.resolver
                    .resolve(&key)
                    .await?
                    .ok_or_else(|| GeocodeError::NotFound(query.trim().to_string()))
            })
            .await;

        match result {
            Ok(place) => Ok(place.clone()),
            Err(err) => {
                self.evict_empty(&key, &cell);
                Err(err)
            }
        }
    }

    /// Drop `key` if its cell is still the one we tried and it never filled.
    fn evict_empty(&self, key: &str, cell: &Arc<OnceCell<GeocodeResult>>) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let stale = entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, cell) && !current.initialized());
        if stale {
            entries.remove(key);
        }
    }

    /// Number of keys currently tracked, including in-flight lookups.
    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Number of keys with a stored resolution.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
