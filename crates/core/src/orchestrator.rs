mod builder;
mod exchange;
mod prompt;

use std::sync::Arc;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use crate::conversation::{Session, Turn};
use crate::geo::LocationResolver;
use crate::map::MapBuilder;
use crate::model_client::ModelClient;
use crate::presenter::Presenter;
pub use builder::OrchestratorBuilder;
use exchange::Exchange;

/// How one user input ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered with text only.
    Completed,
    /// The model asked for a map and it is now displayed. The answer was
    /// cut at that point.
    MapDisplayed,
    /// The exchange failed; the assistant turn holds this description.
    Failed(String),
}

/// Drives one model exchange per user input.
///
/// The orchestrator owns no conversation state. Each call borrows the
/// [`Session`] it works on, so one orchestrator can serve any number of
/// isolated sessions, one exchange at a time per session.
pub struct Orchestrator {
    model_client: ModelClient,
    system_prompt: Option<String>,
    resolver: Arc<dyn LocationResolver>,
    map_builder: MapBuilder,
    default_zoom: i32,
    exchange_timeout: Duration,
    geocoding_timeout: Duration,
    retry: RetryPolicy,
}

impl Orchestrator {
    /// Handles one user input from start to commit.
    ///
    /// The user turn is appended before the model is contacted. Exactly
    /// one assistant turn is appended afterwards, whatever happens: the
    /// full answer, the text preceding a displayed map, or a description
    /// of the failure.
    pub async fn handle_user_input<P: Presenter + ?Sized>(
        &self,
        session: &mut Session,
        input: &str,
        presenter: &P,
    ) -> TurnOutcome {
        session.append(Turn::user(input));
        presenter.render_history(session.snapshot());

        let request =
            prompt::build_model_request(session, self.system_prompt.as_deref());
        let exchange = Exchange::new(self, session, presenter);
        let outcome = match exchange.run(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("exchange failed: {err}");
                let message = format!("Error: {err}");
                session.append(Turn::assistant(message.clone()));
                TurnOutcome::Failed(message)
            }
        };

        presenter.render_history(session.snapshot());
        outcome
    }
}

#[derive(Clone, Copy, Debug)]
struct RetryPolicy {
    initial_interval: Duration,
    max_elapsed: Duration,
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(30),
        }
    }
}
