//! Turning place names into coordinates.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

/// A point on the globe, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    /// Latitude, positive north.
    pub latitude: f64,
    /// Longitude, positive east.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A resolved place.
///
/// Locations only come out of a [`LocationResolver`]; the orchestrator
/// never makes one up.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    /// The place name as the model asked for it.
    pub name: String,
    /// Where the place is.
    pub coordinates: Coordinates,
    /// Text shown with the marker.
    pub description: String,
}

impl Location {
    /// Creates a location whose description is its name.
    pub fn new<S: Into<String>>(name: S, coordinates: Coordinates) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            coordinates,
        }
    }
}

/// Looks up place names.
///
/// Implementations swallow every failure (no match, bad status, network
/// error, timeout, malformed payload) into `None`. Given the same upstream
/// answers, the result must be the same.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    /// Returns the best match for `name`, or `None`.
    async fn resolve(&self, name: &str) -> Option<Coordinates>;
}

/// A resolver backed by a fixed table.
///
/// Lookups ignore case and surrounding whitespace.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    places: HashMap<String, Coordinates>,
}

impl StaticResolver {
    /// Creates a resolver knowing a handful of popular destinations.
    pub fn with_well_known_places() -> Self {
        Self::default()
            .with_place("Paris", Coordinates::new(48.8566, 2.3522))
            .with_place("New York", Coordinates::new(40.7128, -74.0060))
            .with_place("Tokyo", Coordinates::new(35.682839, 139.759455))
            .with_place("London", Coordinates::new(51.5074, -0.1278))
            .with_place("Dubai", Coordinates::new(25.276987, 55.296249))
    }

    /// Adds a place to the table.
    #[inline]
    pub fn with_place(mut self, name: &str, coordinates: Coordinates) -> Self {
        self.places.insert(normalize(name), coordinates);
        self
    }
}

#[async_trait]
impl LocationResolver for StaticResolver {
    async fn resolve(&self, name: &str) -> Option<Coordinates> {
        self.places.get(&normalize(name)).copied()
    }
}

/// Remembers every answer of the wrapped resolver, misses included.
pub struct CachingResolver<R> {
    inner: R,
    cache: Mutex<HashMap<String, Option<Coordinates>>>,
}

impl<R: LocationResolver> CachingResolver<R> {
    /// Wraps `inner` with an empty cache.
    #[inline]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::default(),
        }
    }
}

#[async_trait]
impl<R: LocationResolver> LocationResolver for CachingResolver<R> {
    async fn resolve(&self, name: &str) -> Option<Coordinates> {
        let key = normalize(name);
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied();
        if let Some(coordinates) = cached {
            trace!("geocoding cache hit for {key:?}");
            return coordinates;
        }

        let coordinates = self.inner.resolve(name).await;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, coordinates);
        coordinates
    }
}

#[inline]
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticResolver::with_well_known_places();
        assert_eq!(
            resolver.resolve("Paris").await,
            Some(Coordinates::new(48.8566, 2.3522))
        );
        assert_eq!(
            resolver.resolve("  new york ").await,
            Some(Coordinates::new(40.7128, -74.0060))
        );
        assert_eq!(resolver.resolve("⟂unknown-place⟂").await, None);
    }

    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationResolver for CountingResolver {
        async fn resolve(&self, name: &str) -> Option<Coordinates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (name == "Oslo").then_some(Coordinates::new(59.9139, 10.7522))
        }
    }

    #[tokio::test]
    async fn test_caching_resolver_remembers_hits_and_misses() {
        let resolver = CachingResolver::new(CountingResolver::default());

        for _ in 0..3 {
            assert!(resolver.resolve("Oslo").await.is_some());
            assert!(resolver.resolve("Atlantis").await.is_none());
        }
        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 2);
    }
}
