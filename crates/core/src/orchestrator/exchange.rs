use std::time::Duration;

use backoff::backoff::Backoff;
use roamer_model::{ErrorKind, ModelRequest, ModelResponseEvent, ToolCallRequest};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::Instrument;

use super::{Orchestrator, TurnOutcome};
use crate::conversation::{Session, Turn};
use crate::geo::Location;
use crate::model_client::{ClientError, ModelClientResponse};
use crate::presenter::Presenter;
use crate::tool::DisplayLocations;

#[derive(Debug, Error)]
pub(super) enum ExchangeError {
    #[error("{0}")]
    Model(ClientError),
    #[error("the model did not respond within {0:?}")]
    TimedOut(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingModel,
    StreamingText,
    ToolRequested,
    ToolExecuting,
    Committed,
}

/// One model exchange, from opening the stream to committing the answer.
pub(super) struct Exchange<'a, P: ?Sized> {
    orchestrator: &'a Orchestrator,
    session: &'a mut Session,
    presenter: &'a P,
    stage: Stage,
    draft: String,
}

impl<'a, P: Presenter + ?Sized> Exchange<'a, P> {
    pub(super) fn new(
        orchestrator: &'a Orchestrator,
        session: &'a mut Session,
        presenter: &'a P,
    ) -> Self {
        Self {
            orchestrator,
            session,
            presenter,
            stage: Stage::Idle,
            draft: String::new(),
        }
    }

    /// Runs the exchange.
    ///
    /// On success the assistant turn is already committed. On failure
    /// nothing is, and the partial draft is thrown away.
    pub(super) async fn run(
        mut self,
        request: ModelRequest,
    ) -> Result<TurnOutcome, ExchangeError> {
        self.enter(Stage::AwaitingModel);
        let mut response = self.open(request).await?;

        self.enter(Stage::StreamingText);
        let idle_timeout = self.orchestrator.exchange_timeout;
        loop {
            let event = timeout(idle_timeout, response.next_event())
                .await
                .map_err(|_| ExchangeError::TimedOut(idle_timeout))?
                .map_err(ExchangeError::Model)?;
            match event {
                Some(ModelResponseEvent::MessageDelta(delta)) => {
                    self.draft.push_str(&delta);
                    self.presenter.render_streaming_draft(&self.draft);
                }
                Some(ModelResponseEvent::ToolCall(req)) => {
                    if self.execute_tool(&req).await {
                        // Nothing after a displayed map is read.
                        // TODO: keep consuming and append the follow-up text
                        // to the same assistant turn instead of dropping it.
                        drop(response);
                        self.commit();
                        return Ok(TurnOutcome::MapDisplayed);
                    }
                    self.enter(Stage::StreamingText);
                }
                Some(ModelResponseEvent::Completed(reason)) => {
                    debug!("model finished: {reason:?}");
                }
                None => break,
            }
        }

        self.commit();
        Ok(TurnOutcome::Completed)
    }

    fn enter(&mut self, stage: Stage) {
        debug!("exchange stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    async fn open(
        &self,
        request: ModelRequest,
    ) -> Result<ModelClientResponse, ExchangeError> {
        let orchestrator = self.orchestrator;
        let idle_timeout = orchestrator.exchange_timeout;
        let mut backoff = orchestrator.retry.backoff();
        loop {
            let attempt = orchestrator.model_client.send_request(request.clone());
            let err = match timeout(idle_timeout, attempt).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => err,
                Err(_) => return Err(ExchangeError::TimedOut(idle_timeout)),
            };
            if err.kind() != ErrorKind::RateLimitExceeded {
                return Err(ExchangeError::Model(err));
            }
            let Some(delay) = backoff.next_backoff() else {
                return Err(ExchangeError::Model(err));
            };
            warn!("model is rate limited, retrying in {delay:?}");
            sleep(delay).await;
        }
    }

    /// Returns whether a map was displayed.
    async fn execute_tool(&mut self, req: &ToolCallRequest) -> bool {
        self.enter(Stage::ToolRequested);
        let Some(args) = DisplayLocations::from_request(req) else {
            return false;
        };

        self.enter(Stage::ToolExecuting);
        let span = info_span!("display locations", id = %req.id);
        let locations = self.resolve_all(&args.locations).instrument(span).await;
        if locations.is_empty() {
            info!("none of {:?} could be located", args.locations);
            return false;
        }

        let zoom = args.zoom_level.unwrap_or(self.orchestrator.default_zoom);
        match self.orchestrator.map_builder.build(&locations, zoom) {
            Ok(map) => {
                self.session.replace_map(map);
                self.presenter.render_map(self.session.current_map());
                true
            }
            Err(err) => {
                error!("failed to build map: {err}");
                self.presenter.render_error(&err.to_string());
                false
            }
        }
    }

    /// Looks the names up one at a time, in request order.
    ///
    /// A throttling resolver queues concurrent lookups, and each timeout
    /// must only cover its own request.
    async fn resolve_all(&self, names: &[String]) -> Vec<Location> {
        let resolver = &self.orchestrator.resolver;
        let lookup_timeout = self.orchestrator.geocoding_timeout;
        let mut locations = Vec::with_capacity(names.len());
        for name in names {
            match timeout(lookup_timeout, resolver.resolve(name)).await {
                Ok(Some(coordinates)) => {
                    locations.push(Location::new(name, coordinates));
                }
                Ok(None) => debug!("no match for {name:?}"),
                Err(_) => warn!("looking up {name:?} timed out"),
            }
        }
        locations
    }

    fn commit(&mut self) {
        let answer = std::mem::take(&mut self.draft);
        self.session.append(Turn::assistant(answer));
        self.enter(Stage::Committed);
        self.enter(Stage::Idle);
    }
}
