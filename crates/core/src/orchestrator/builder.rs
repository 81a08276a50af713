use std::sync::Arc;
use std::time::Duration;

use roamer_model::ModelProvider;

use super::{Orchestrator, RetryPolicy};
use crate::geo::{LocationResolver, StaticResolver};
use crate::map::{DEFAULT_ZOOM, MapBuilder};
use crate::model_client::ModelClient;

/// [`Orchestrator`] builder.
pub struct OrchestratorBuilder {
    model_client: ModelClient,
    system_prompt: Option<String>,
    resolver: Option<Arc<dyn LocationResolver>>,
    default_zoom: i32,
    exchange_timeout: Duration,
    geocoding_timeout: Duration,
    retry: RetryPolicy,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: None,
            resolver: None,
            default_zoom: DEFAULT_ZOOM,
            exchange_timeout: Duration::from_secs(60),
            geocoding_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the system instructions sent with every request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the resolver used for `displayLocations` calls.
    ///
    /// Without one, only a small table of well-known destinations can be
    /// shown.
    #[inline]
    pub fn with_resolver<R: LocationResolver + 'static>(
        mut self,
        resolver: R,
    ) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Sets the zoom used when the model doesn't ask for one.
    #[inline]
    pub fn with_default_zoom(mut self, zoom: i32) -> Self {
        self.default_zoom = zoom;
        self
    }

    /// Sets how long to wait for the model to accept a request, and then
    /// for each following event.
    #[inline]
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    /// Sets how long a single place lookup may take.
    #[inline]
    pub fn with_geocoding_timeout(mut self, timeout: Duration) -> Self {
        self.geocoding_timeout = timeout;
        self
    }

    /// Sets the backoff used when the model is rate limited.
    ///
    /// Retrying stops once `max_elapsed` has passed since the first
    /// attempt.
    #[inline]
    pub fn with_retry_backoff(
        mut self,
        initial_interval: Duration,
        max_elapsed: Duration,
    ) -> Self {
        self.retry = RetryPolicy {
            initial_interval,
            max_elapsed,
        };
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(StaticResolver::with_well_known_places()));
        Orchestrator {
            model_client: self.model_client,
            system_prompt: self.system_prompt,
            resolver,
            map_builder: MapBuilder,
            default_zoom: self.default_zoom,
            exchange_timeout: self.exchange_timeout,
            geocoding_timeout: self.geocoding_timeout,
            retry: self.retry,
        }
    }
}
