use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{self, Poll, ready};
use std::time::Duration;

use roamer_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use serde_json::json;
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the prompt word by word, then asks to show the last word on a
/// map.
#[derive(Debug)]
struct FakeModelResponse {
    fake_items: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
    pulled: Arc<AtomicUsize>,
}

impl FakeModelResponse {
    fn new(input: &str, pulled: Arc<AtomicUsize>) -> Self {
        let words: Vec<_> = input.split(' ').collect();
        let mut fake_items: VecDeque<_> = format!("You said {input}")
            .split(' ')
            .map(|w| ModelResponseEvent::MessageDelta(w.to_owned()))
            .collect();
        if let Some(place) = words.last() {
            fake_items.push_back(ModelResponseEvent::ToolCall(
                ToolCallRequest {
                    id: "call:0".to_owned(),
                    name: "displayLocations".to_owned(),
                    arguments: json!({ "locations": [place] }),
                },
            ));
        }
        fake_items.push_back(ModelResponseEvent::Completed(
            ModelFinishReason::ToolCalls,
        ));
        Self {
            fake_items,
            sleep: None,
            pulled,
        }
    }
}

impl ModelResponse for FakeModelResponse {
    type Error = FakeModelProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            let item = this.fake_items.pop_front();
            if item.is_some() {
                this.pulled.fetch_add(1, Ordering::SeqCst);
            }
            return Poll::Ready(Ok(item));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct FakeModelProvider {
    pulled: Arc<AtomicUsize>,
}

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Response = FakeModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let input = req.messages.iter().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.clone()),
            _ => None,
        });
        let result = match input {
            Some(input) => {
                Ok(FakeModelResponse::new(&input, Arc::clone(&self.pulled)))
            }
            None => Err(FakeModelProviderError(ErrorKind::Other)),
        };
        ready(result)
    }
}

#[tokio::test]
async fn test_completion() {
    let provider = FakeModelProvider::default();
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("You plan trips.".to_owned()),
            ModelMessage::User("Visit Lisbon".to_owned()),
        ],
        tools: vec![],
    };
    assert_eq!(req.system_prompt(), Some("You plan trips."));
    let mut resp = provider.send_request(&req).await.unwrap();

    let mut words = Vec::new();
    let mut tool_call = None;
    loop {
        match poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx)).await {
            Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                words.push(delta)
            }
            Ok(Some(ModelResponseEvent::ToolCall(req))) => {
                tool_call = Some(req)
            }
            Ok(Some(ModelResponseEvent::Completed(reason))) => {
                assert_eq!(reason, ModelFinishReason::ToolCalls);
            }
            Ok(None) => break,
            Err(err) => unreachable!("unexpected error: {err:?}"),
        }
    }

    assert_eq!(words.join(" "), "You said Visit Lisbon");
    assert_eq!(
        tool_call.unwrap().arguments,
        json!({ "locations": ["Lisbon"] })
    );
}

#[tokio::test]
async fn test_drop_stops_pulling() {
    let provider = FakeModelProvider::default();
    let req = ModelRequest {
        messages: vec![ModelMessage::User("Visit Rome".to_owned())],
        tools: vec![],
    };
    let mut resp = provider.send_request(&req).await.unwrap();
    poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
        .await
        .unwrap();
    drop(resp);

    assert_eq!(provider.pulled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_error() {
    let provider = FakeModelProvider::default();
    let req = ModelRequest {
        messages: vec![],
        tools: vec![],
    };
    let result = provider.send_request(&req).await;
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}
