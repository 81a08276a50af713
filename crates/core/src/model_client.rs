use std::fmt::{self, Debug};
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use roamer_model::{
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tracing::Instrument;

pub(crate) type ClientError = Box<dyn ModelProviderError>;
type SendRequestResult = Result<ModelClientResponse, ClientError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    match fut.await {
                        Ok(resp) => Ok(ModelClientResponse {
                            inner: Box::pin(resp),
                        }),
                        Err(err) => {
                            error!("got an error: {err:?}");
                            Err(Box::new(err) as ClientError)
                        }
                    }
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Opens an exchange with the model.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

/// An open exchange with the model.
///
/// Events are pulled on demand. Dropping the response ends the exchange
/// and no further events are requested from the provider.
pub struct ModelClientResponse {
    inner: Pin<Box<dyn ErasedResponse>>,
}

impl ModelClientResponse {
    /// Waits for the next event. `Ok(None)` means the stream has ended.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. An event that was not yet delivered
    /// stays in the response.
    #[inline]
    pub async fn next_event(
        &mut self,
    ) -> Result<Option<ModelResponseEvent>, ClientError> {
        poll_fn(|cx| self.inner.as_mut().poll_next_event(cx)).await
    }
}

impl Debug for ModelClientResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClientResponse").finish_non_exhaustive()
    }
}

trait ErasedResponse: Send {
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, ClientError>>;
}

impl<R: ModelResponse> ErasedResponse for R {
    #[inline]
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, ClientError>> {
        ModelResponse::poll_next_event(self, cx)
            .map_err(|err| Box::new(err) as ClientError)
    }
}

#[cfg(test)]
mod tests {
    use roamer_model::{ErrorKind, ModelFinishReason, ModelMessage};
    use roamer_test_model::{PresetEvent, PresetResponse, TestModelProvider};

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User("User: Hi".to_owned())],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let mut resp = model_client.send_request(request()).await.unwrap();
            let mut transcript = String::new();
            let mut finish_reason = None;
            while let Some(event) = resp.next_event().await.unwrap() {
                match event {
                    ModelResponseEvent::MessageDelta(delta) => {
                        transcript.push_str(&delta)
                    }
                    ModelResponseEvent::Completed(reason) => {
                        finish_reason = Some(reason)
                    }
                    ModelResponseEvent::ToolCall(req) => {
                        unreachable!("unexpected tool call: {req:?}")
                    }
                }
            }
            assert_eq!(transcript, "How are you?");
            assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
        }
    }

    #[tokio::test]
    async fn test_drop_ends_exchange() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("One".to_owned()),
            PresetEvent::MessageDelta("Two".to_owned()),
        ]));
        let model_client = ModelClient::new(model_provider.clone());

        let mut resp = model_client.send_request(request()).await.unwrap();
        resp.next_event().await.unwrap();
        drop(resp);

        assert_eq!(model_provider.pulled_events(), 1);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client.send_request(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
