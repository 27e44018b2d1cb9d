// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider for the Persona service.
//!
//! This crate implements [`ProviderAdapter`] for the Anthropic Messages API,
//! providing both single-shot completion and streaming SSE responses.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use futures::stream::StreamExt;
use persona_config::PersonaConfig;
use persona_core::types::{
    ProviderRequest, ProviderResponse, ProviderStreamChunk, StreamEventType, TokenUsage,
};
use persona_core::{
    AdapterType, HealthStatus, PersonaError, PluginAdapter, ProviderAdapter, ProviderStream,
};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::sse::StreamEvent;
use crate::types::{ApiMessage, ApiUsage, MessageRequest, ResponseContentBlock, SseDelta};

/// Anthropic Claude provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `ANTHROPIC_API_KEY` env var -> error.
pub struct AnthropicProvider {
    client: AnthropicClient,
}

impl AnthropicProvider {
    /// Creates a provider from configuration, failing when no API key resolves.
    pub fn new(config: &PersonaConfig) -> Result<Self, PersonaError> {
        let api_key = resolve_api_key(&config.anthropic.api_key)?;
        let client = AnthropicClient::new(
            &api_key,
            &config.anthropic.api_version,
            config.anthropic.default_model.clone(),
        )?;

        info!(
            model = %config.anthropic.default_model,
            "Anthropic provider initialized"
        );
        Ok(Self { client })
    }

    /// Like [`new`](Self::new), but a missing API key yields `Ok(None)` (mock mode).
    pub fn from_config(config: &PersonaConfig) -> Result<Option<Self>, PersonaError> {
        if !api_key_configured(&config.anthropic.api_key) {
            return Ok(None);
        }
        Self::new(config).map(Some)
    }

    #[cfg(test)]
    fn with_client(client: AnthropicClient) -> Self {
        Self { client }
    }

    fn to_message_request(&self, request: &ProviderRequest) -> MessageRequest {
        let model = if request.model.is_empty() {
            self.client.default_model().to_string()
        } else {
            request.model.clone()
        };
        MessageRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            system: request.system_prompt.clone(),
            max_tokens: request.max_tokens,
            stream: request.stream,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        // No API call: health checks must not consume tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, PersonaError> {
        let api_request = self.to_message_request(&request);
        let response = self.client.complete_message(&api_request).await?;

        let content = response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(ProviderResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason: response.stop_reason,
            usage: convert_usage(&response.usage),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, PersonaError> {
        let api_request = self.to_message_request(&request);
        let event_stream = self.client.stream_message(&api_request).await?;

        let mut stop_reason: Option<String> = None;
        let chunk_stream = event_stream.filter_map(move |result| {
            let chunk = match result {
                Ok(event) => map_stream_event(event, &mut stop_reason),
                Err(e) => Some(Err(e)),
            };
            async move { chunk }
        });

        Ok(Box::pin(chunk_stream))
    }
}

fn convert_usage(usage: &ApiUsage) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
    }
}

fn chunk(event_type: StreamEventType) -> ProviderStreamChunk {
    ProviderStreamChunk {
        event_type,
        text: None,
        usage: None,
        error: None,
        stop_reason: None,
    }
}

/// Maps an SSE [`StreamEvent`] to a [`ProviderStreamChunk`], remembering the
/// stop reason from `message_delta` so `message_stop` can report it.
fn map_stream_event(
    event: StreamEvent,
    stop_reason: &mut Option<String>,
) -> Option<Result<ProviderStreamChunk, PersonaError>> {
    match event {
        StreamEvent::ContentBlockDelta(delta) => match delta.delta {
            SseDelta::TextDelta { text } => Some(Ok(ProviderStreamChunk::text(text))),
            SseDelta::Other => None,
        },
        StreamEvent::MessageStart(ms) => Some(Ok(ProviderStreamChunk {
            usage: Some(convert_usage(&ms.message.usage)),
            ..chunk(StreamEventType::MessageStart)
        })),
        StreamEvent::MessageDelta(md) => {
            if let Some(reason) = &md.delta.stop_reason {
                *stop_reason = Some(reason.clone());
            }
            Some(Ok(ProviderStreamChunk {
                usage: md.usage.as_ref().map(convert_usage),
                stop_reason: md.delta.stop_reason,
                ..chunk(StreamEventType::MessageDelta)
            }))
        }
        StreamEvent::MessageStop => Some(Ok(ProviderStreamChunk {
            stop_reason: stop_reason.clone(),
            ..chunk(StreamEventType::MessageStop)
        })),
        StreamEvent::Error(err) => Some(Ok(ProviderStreamChunk {
            error: Some(format!("{}: {}", err.error.type_, err.error.message)),
            ..chunk(StreamEventType::Error)
        })),
        StreamEvent::Ping => None,
    }
}

fn api_key_configured(config_key: &Option<String>) -> bool {
    config_key.as_deref().is_some_and(|k| !k.is_empty())
        || std::env::var("ANTHROPIC_API_KEY").is_ok_and(|k| !k.is_empty())
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, PersonaError> {
    if let Some(key) = config_key.as_deref().filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            PersonaError::Config(
                "Anthropic API key not found. Set anthropic.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
            )
        })
}
