use std::time::Duration;

use roamer_core::{
    DocumentExtractor, IngestOutcome, LocationResolver, Orchestrator,
    OrchestratorBuilder, Presenter, Session, TurnOutcome, ingest_document,
};
use roamer_model::ModelProvider;

use crate::pdf::PdfExtractor;

/// The instructions the assistant runs with unless told otherwise.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// An assistant builder.
///
/// See [`Assistant`].
pub struct AssistantBuilder {
    orchestrator_builder: OrchestratorBuilder,
    extractor: Box<dyn DocumentExtractor>,
}

impl AssistantBuilder {
    /// Creates an assistant builder with a specified model provider.
    ///
    /// The assistant starts with [`DEFAULT_SYSTEM_PROMPT`] and reads
    /// uploads as PDF.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let orchestrator_builder =
            OrchestratorBuilder::with_model_provider(provider)
                .with_system_prompt(DEFAULT_SYSTEM_PROMPT);
        Self {
            orchestrator_builder,
            extractor: Box::new(PdfExtractor::new()),
        }
    }

    /// Replaces the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.orchestrator_builder =
            self.orchestrator_builder.with_system_prompt(prompt);
        self
    }

    /// Sets how places are looked up.
    #[inline]
    pub fn with_resolver<R: LocationResolver + 'static>(
        mut self,
        resolver: R,
    ) -> Self {
        self.orchestrator_builder =
            self.orchestrator_builder.with_resolver(resolver);
        self
    }

    /// Sets how uploaded documents are turned into text.
    #[inline]
    pub fn with_extractor<E: DocumentExtractor + 'static>(
        mut self,
        extractor: E,
    ) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Sets how long the model may stay silent before the answer is
    /// abandoned.
    #[inline]
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.orchestrator_builder =
            self.orchestrator_builder.with_exchange_timeout(timeout);
        self
    }

    /// Sets how long looking up one place may take.
    #[inline]
    pub fn with_geocoding_timeout(mut self, timeout: Duration) -> Self {
        self.orchestrator_builder =
            self.orchestrator_builder.with_geocoding_timeout(timeout);
        self
    }

    /// Sets the zoom used when the model shows places without picking one.
    #[inline]
    pub fn with_default_zoom(mut self, zoom: i32) -> Self {
        self.orchestrator_builder =
            self.orchestrator_builder.with_default_zoom(zoom);
        self
    }

    /// Builds a new assistant with an empty session.
    pub fn build(self) -> Assistant {
        Assistant {
            orchestrator: self.orchestrator_builder.build(),
            extractor: self.extractor,
            session: Session::new(),
        }
    }
}

/// A chat with the travel assistant, like a window with the conversation,
/// a map and an upload button.
///
/// The assistant holds one [`Session`]. Everything it shows goes through
/// the [`Presenter`] passed to [`send_message`](Self::send_message).
pub struct Assistant {
    orchestrator: Orchestrator,
    extractor: Box<dyn DocumentExtractor>,
    session: Session,
}

impl Assistant {
    /// Sends a message and waits for the whole answer.
    #[inline]
    pub async fn send_message<P: Presenter + ?Sized>(
        &mut self,
        message: &str,
        presenter: &P,
    ) -> TurnOutcome {
        self.orchestrator
            .handle_user_input(&mut self.session, message, presenter)
            .await
    }

    /// Adds a document to the context of the following messages.
    ///
    /// `identity` is usually the file name. Uploading the same identity
    /// twice keeps the first text.
    #[inline]
    pub fn upload_document(
        &mut self,
        identity: &str,
        bytes: &[u8],
    ) -> IngestOutcome {
        ingest_document(&mut self.session, &*self.extractor, identity, bytes)
    }

    /// Forgets the conversation, the documents and the map.
    #[inline]
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Returns the session state.
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use roamer_core::{IngestError, MapArtifact, Role, Turn};
    use roamer_model::ToolCallRequest;
    use roamer_test_model::{PresetEvent, PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;

    struct Silent;

    impl Presenter for Silent {
        fn render_history(&self, _turns: &[Turn]) {}
        fn render_streaming_draft(&self, _draft: &str) {}
        fn render_map(&self, _map: Option<&MapArtifact>) {}
        fn render_error(&self, _message: &str) {}
    }

    struct PlainText;

    impl DocumentExtractor for PlainText {
        fn extract(&self, bytes: &[u8]) -> Result<String, IngestError> {
            String::from_utf8(bytes.to_vec())
                .map(|text| text.trim().to_owned())
                .map_err(|err| IngestError::Unreadable(err.to_string()))
        }
    }

    #[tokio::test]
    async fn test_conversation_with_map_and_reset() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Tokyo fits that budget.".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call:0".to_owned(),
                name: "displayLocations".to_owned(),
                arguments: json!({ "locations": ["Tokyo"], "zoomLevel": 11 }),
            }),
        ]));

        let mut assistant =
            AssistantBuilder::with_model_provider(provider.clone())
                .with_extractor(PlainText)
                .build();

        assert_eq!(
            assistant.upload_document("budget.txt", b"Total: 2000 USD\n"),
            IngestOutcome::Added
        );
        assert_eq!(
            assistant.upload_document("budget.txt", b"Total: 1 USD"),
            IngestOutcome::AlreadyPresent
        );

        let outcome =
            assistant.send_message("Where can I go?", &Silent).await;
        assert_eq!(outcome, TurnOutcome::MapDisplayed);

        let session = assistant.session();
        assert_eq!(session.snapshot().len(), 2);
        assert_eq!(session.snapshot()[1].role(), Role::Assistant);
        assert_eq!(session.current_map().map(|map| map.zoom), Some(11));

        let request = &provider.requests()[0];
        assert_eq!(request.system_prompt(), Some(DEFAULT_SYSTEM_PROMPT));

        assistant.reset();
        let session = assistant.session();
        assert!(session.snapshot().is_empty());
        assert!(session.documents().is_empty());
        assert!(session.current_map().is_none());
    }

    #[tokio::test]
    async fn test_default_zoom() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call:0".to_owned(),
                name: "displayLocations".to_owned(),
                arguments: json!({ "locations": ["Dubai"] }),
            }),
        ]));

        let mut assistant = AssistantBuilder::with_model_provider(provider)
            .with_default_zoom(5)
            .build();
        let outcome = assistant.send_message("Somewhere warm?", &Silent).await;

        assert_eq!(outcome, TurnOutcome::MapDisplayed);
        assert_eq!(assistant.session().current_map().map(|map| map.zoom), Some(5));
    }

    #[test]
    fn test_unreadable_upload() {
        let mut assistant =
            AssistantBuilder::with_model_provider(TestModelProvider::default())
                .build();
        let outcome = assistant.upload_document("notes.pdf", b"plain text");
        assert!(matches!(outcome, IngestOutcome::Failed(_)));
        assert!(assistant.session().documents().is_empty());
    }
}
