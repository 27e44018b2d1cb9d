// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for Anthropic Messages API streaming responses.
//!
//! Converts a reqwest response byte stream into typed [`StreamEvent`] variants
//! using the `eventsource-stream` crate for SSE protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use persona_core::PersonaError;
use serde::de::DeserializeOwned;

use crate::types::{SseContentBlockDelta, SseError, SseMessageDelta, SseMessageStart};

/// Typed SSE events from the Anthropic streaming protocol.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    MessageStart(SseMessageStart),
    ContentBlockDelta(SseContentBlockDelta),
    MessageDelta(SseMessageDelta),
    MessageStop,
    /// Keep-alive ping.
    Ping,
    Error(SseError),
}

/// Boxed stream of parsed SSE events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, PersonaError>> + Send>>;

fn parse_event<T: DeserializeOwned>(name: &str, data: &str) -> Result<T, PersonaError> {
    serde_json::from_str::<T>(data).map_err(|e| PersonaError::Provider {
        message: format!("failed to parse {name}: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parses a streaming response into typed [`StreamEvent`]s.
///
/// Unknown event names (including `content_block_start`/`stop`, which carry
/// nothing for text streaming) are skipped per Anthropic's versioning policy.
pub fn parse_sse_stream(response: reqwest::Response) -> EventStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let name = event.event.as_str();
                let parsed = match name {
                    "message_start" => {
                        parse_event(name, &event.data).map(StreamEvent::MessageStart)
                    }
                    "content_block_delta" => {
                        parse_event(name, &event.data).map(StreamEvent::ContentBlockDelta)
                    }
                    "message_delta" => {
                        parse_event(name, &event.data).map(StreamEvent::MessageDelta)
                    }
                    "message_stop" => Ok(StreamEvent::MessageStop),
                    "ping" => Ok(StreamEvent::Ping),
                    "error" => parse_event(name, &event.data).map(StreamEvent::Error),
                    _ => return None,
                };
                Some(parsed)
            }
            Err(e) => Some(Err(PersonaError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}
