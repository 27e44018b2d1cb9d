// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use persona_core::{
    AdapterType, HealthStatus, PersonaError, PluginAdapter, ProviderAdapter, ProviderRequest,
    ProviderResponse, ProviderStream, ProviderStreamChunk, StreamEventType, TokenUsage,
};

enum Scripted {
    Text(String),
    Failure(String),
}

/// A mock LLM provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue shared by `complete` and
/// `stream`. When the queue is empty, a default "mock response" text is
/// returned. Every request is recorded.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(Scripted::Text).collect(),
            )),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: String) {
        self.responses.lock().await.push_back(Scripted::Text(text));
    }

    /// Queue a failure. `complete` returns it as an error; `stream` fails
    /// after the message start event.
    pub async fn add_failure(&self, message: String) {
        self.responses
            .lock()
            .await
            .push_back(Scripted::Failure(message));
    }

    /// All requests seen so far, oldest first.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_response(&self, request: &ProviderRequest) -> Scripted {
        self.requests.lock().await.push(request.clone());
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Scripted::Text("mock response".to_string()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn event(event_type: StreamEventType) -> ProviderStreamChunk {
    ProviderStreamChunk {
        event_type,
        text: None,
        usage: None,
        error: None,
        stop_reason: None,
    }
}

fn failure(message: String) -> PersonaError {
    PersonaError::Provider {
        message,
        source: None,
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, PersonaError> {
        match self.next_response(&request).await {
            Scripted::Text(text) => Ok(ProviderResponse {
                id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
                content: text,
                model: request.model,
                stop_reason: Some("end_turn".to_string()),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            }),
            Scripted::Failure(message) => Err(failure(message)),
        }
    }

    /// Streams the next response one word per delta, framed by the usual
    /// start, delta, and stop events.
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, PersonaError> {
        let mut chunks = vec![Ok(event(StreamEventType::MessageStart))];
        match self.next_response(&request).await {
            Scripted::Text(text) => {
                chunks.extend(
                    text.split_inclusive(' ')
                        .map(|word| Ok(ProviderStreamChunk::text(word))),
                );
                chunks.push(Ok(ProviderStreamChunk {
                    usage: Some(TokenUsage {
                        input_tokens: 10,
                        output_tokens: 20,
                    }),
                    stop_reason: Some("end_turn".to_string()),
                    ..event(StreamEventType::MessageDelta)
                }));
                chunks.push(Ok(event(StreamEventType::MessageStop)));
            }
            Scripted::Failure(message) => chunks.push(Err(failure(message))),
        }
        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn request(stream: bool) -> ProviderRequest {
        ProviderRequest {
            model: "test-model".to_string(),
            system_prompt: None,
            messages: vec![],
            max_tokens: 100,
            stream,
        }
    }

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(request(false)).await.unwrap();
        assert_eq!(resp.content, "mock response");
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider =
            MockProvider::with_responses(vec!["first".to_string(), "second".to_string()]);
        provider.add_response("third".to_string()).await;

        assert_eq!(provider.complete(request(false)).await.unwrap().content, "first");
        assert_eq!(provider.complete(request(false)).await.unwrap().content, "second");
        assert_eq!(provider.complete(request(false)).await.unwrap().content, "third");
        assert_eq!(
            provider.complete(request(false)).await.unwrap().content,
            "mock response"
        );
        assert_eq!(provider.requests().await.len(), 4);
    }

    #[tokio::test]
    async fn stream_splits_words() {
        let provider = MockProvider::with_responses(vec!["streamed text here".to_string()]);
        let mut stream = provider.stream(request(true)).await.unwrap();
        let mut events = Vec::new();
        while let Some(chunk) = stream.next().await {
            events.push(chunk.unwrap());
        }

        assert_eq!(events.len(), 6);
        assert_eq!(events[0].event_type, StreamEventType::MessageStart);
        let text: String = events.iter().filter_map(|e| e.text.clone()).collect();
        assert_eq!(text, "streamed text here");
        assert_eq!(events[4].stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(events[5].event_type, StreamEventType::MessageStop);
    }

    #[tokio::test]
    async fn queued_failure_breaks_stream() {
        let provider = MockProvider::new();
        provider.add_failure("overloaded".to_string()).await;
        let mut stream = provider.stream(request(true)).await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn queued_failure_fails_completion() {
        let provider = MockProvider::new();
        provider.add_failure("overloaded".to_string()).await;
        let err = provider.complete(request(false)).await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }
}
