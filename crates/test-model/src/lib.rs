//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use roamer_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    failed: bool,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
    state: Arc<Mutex<ScriptState>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if this.failed || this.event_idx > this.events.len() {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if this.event_idx < this.events.len() {
                let event = match &this.events[this.event_idx] {
                    PresetEvent::MessageDelta(msg) => {
                        ModelResponseEvent::MessageDelta(msg.clone())
                    }
                    PresetEvent::ToolCall(req) => {
                        ModelResponseEvent::ToolCall(req.clone())
                    }
                    PresetEvent::Error(message) => {
                        this.failed = true;
                        return Poll::Ready(Err(Error {
                            message: message.clone(),
                            kind: ErrorKind::Other,
                        }));
                    }
                };
                this.event_idx += 1;
                lock(&this.state).pulled_events += 1;
                return Poll::Ready(Ok(Some(event)));
            }

            this.event_idx += 1;
            let has_tool_call = this
                .events
                .iter()
                .any(|event| matches!(event, PresetEvent::ToolCall(_)));
            return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                if has_tool_call {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                },
            ))));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct ScriptState {
    script: VecDeque<ScriptStep>,
    requests: Vec<ModelRequest>,
    pulled_events: usize,
}

struct ScriptStep {
    preset: PresetResponse,
    attempts: u64,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Every successful request consumes
/// one preset response in order. If there are no enough presets in the
/// script, an error will be returned.
///
/// Clones share the same script, so a test can keep a clone around to
/// inspect the requests the provider has received.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    state: Arc<Mutex<ScriptState>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        lock(&self.state).script.push_back(ScriptStep {
            preset,
            attempts: 0,
        });
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.state).requests.clone()
    }

    /// Returns how many events have been delivered to callers.
    pub fn pulled_events(&self) -> usize {
        lock(&self.state).pulled_events
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut state = lock(&self.state);
        state.requests.push(req.clone());

        let result = 'blk: {
            let Some(step) = state.script.front_mut() else {
                break 'blk Err(Error {
                    message: "no enough steps".to_owned(),
                    kind: ErrorKind::Other,
                });
            };
            step.attempts += 1;
            let should_fail = match step.preset.failures {
                Some(0) => true,
                Some(failures) => step.attempts <= failures,
                None => false,
            };
            if should_fail {
                break 'blk Err(Error {
                    message: "scripted failure".to_owned(),
                    kind: ErrorKind::RateLimitExceeded,
                });
            }

            let events = step.preset.events.clone();
            state.script.pop_front();
            Ok(TestModelResponse {
                events,
                event_idx: 0,
                failed: false,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
                state: Arc::clone(&self.state),
            })
        };
        ready(result)
    }
}

fn lock(state: &Mutex<ScriptState>) -> MutexGuard<'_, ScriptState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
