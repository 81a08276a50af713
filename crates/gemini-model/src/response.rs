use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use roamer_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::GenerateContentChunk;

/// Finish reasons that mean the answer was withheld by the service.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

struct PartialState {
    sse: Sse,
    // Decoded events that are not yet delivered. One SSE chunk may carry
    // several parts, each turning into its own event.
    pending_events: VecDeque<ModelResponseEvent>,
    tool_call_count: usize,
    completed: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            pending_events: Default::default(),
            tool_call_count: 0,
            completed: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.completed {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                // Some deployments close the stream without a finish reason.
                partial_state.completed = true;
                continue;
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");

        let chunk = serde_json::from_str::<GenerateContentChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        decode_chunk(chunk, &mut partial_state)?;
    }
}

fn decode_chunk(
    chunk: GenerateContentChunk,
    partial_state: &mut PartialState,
) -> Result<(), Error> {
    if let Some(error) = chunk.error {
        let kind = if error.code == Some(429) {
            ErrorKind::RateLimitExceeded
        } else {
            ErrorKind::Other
        };
        return Err(Error::new(error.message, kind));
    }
    if let Some(block_reason) =
        chunk.prompt_feedback.and_then(|f| f.block_reason)
    {
        return Err(Error::new(
            format!("prompt blocked: {block_reason}"),
            ErrorKind::Moderated,
        ));
    }

    // Only the first candidate is ever requested.
    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(());
    };

    // The order of events are important. Parts are emitted in the order the
    // model produced them, and the finish reason always comes last.
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for part in parts {
        if part.thought == Some(true) {
            continue;
        }
        if let Some(text) = part.text.filter(|t| !t.is_empty()) {
            partial_state
                .pending_events
                .push_back(ModelResponseEvent::MessageDelta(text));
        }
        if let Some(call) = part.function_call {
            let id = format!("call:{}", partial_state.tool_call_count);
            partial_state.tool_call_count += 1;
            partial_state.pending_events.push_back(
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id,
                    name: call.name,
                    arguments: call.args,
                }),
            );
        }
    }

    if let Some(finish_reason) = candidate.finish_reason {
        if BLOCKED_FINISH_REASONS.contains(&finish_reason.as_str()) {
            return Err(Error::new(
                format!("response blocked: {finish_reason}"),
                ErrorKind::Moderated,
            ));
        }
        let finish_reason = if partial_state.tool_call_count > 0 {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        };
        partial_state
            .pending_events
            .push_back(ModelResponseEvent::Completed(finish_reason));
        partial_state.completed = true;
    }
    Ok(())
}
