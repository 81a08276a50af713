//! Place lookup through a Nominatim-compatible search API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use roamer_core::{Coordinates, LocationResolver};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// The public OpenStreetMap search endpoint.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

const USER_AGENT: &str =
    concat!("roamer/", env!("CARGO_PKG_VERSION"), " (travel assistant)");

/// Builder for [`NominatimResolver`].
#[derive(Clone, Debug)]
pub struct NominatimResolverBuilder {
    base_url: String,
    timeout: Duration,
    min_interval: Duration,
}

impl Default for NominatimResolverBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODER_URL.to_owned(),
            timeout: Duration::from_secs(10),
            min_interval: Duration::from_secs(1),
        }
    }
}

impl NominatimResolverBuilder {
    /// Sets the server to query, e.g. a self-hosted instance.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets how long one search request may take.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the minimum delay between two requests.
    ///
    /// The public instance allows one request per second.
    #[inline]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Builds the resolver.
    pub fn build(self) -> Result<NominatimResolver, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()?;
        Ok(NominatimResolver {
            client,
            search_url: format!(
                "{}/search",
                self.base_url.trim_end_matches('/')
            ),
            min_interval: self.min_interval,
            last_request: Mutex::new(None),
        })
    }
}

/// Resolves places with the first hit of a Nominatim search.
pub struct NominatimResolver {
    client: Client,
    search_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimResolver {
    /// Creates a builder with the public endpoint.
    #[inline]
    pub fn builder() -> NominatimResolverBuilder {
        NominatimResolverBuilder::default()
    }

    async fn search(&self, name: &str) -> Result<Vec<Place>, reqwest::Error> {
        {
            let mut last_request = self.last_request.lock().await;
            if let Some(last) = *last_request {
                sleep_until(last + self.min_interval).await;
            }
            *last_request = Some(Instant::now());
        }

        self.client
            .get(&self.search_url)
            .query(&[("q", name), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl LocationResolver for NominatimResolver {
    async fn resolve(&self, name: &str) -> Option<Coordinates> {
        match self.search(name).await {
            Ok(places) => first_match(&places),
            Err(err) => {
                warn!("failed to look up {name:?}: {err}");
                None
            }
        }
    }
}

/// One search hit. Coordinates come as decimal strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

fn first_match(places: &[Place]) -> Option<Coordinates> {
    let place = places.first()?;
    let latitude = place.lat.trim().parse().ok();
    let longitude = place.lon.trim().parse().ok();
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            Some(Coordinates::new(latitude, longitude))
        }
        _ => {
            warn!("malformed search hit: {place:?}");
            None
        }
    }
}
