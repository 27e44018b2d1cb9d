// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the LLM capability.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::PersonaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse, ProviderStreamChunk};

/// Boxed stream of provider chunks.
pub type ProviderStream =
    Pin<Box<dyn Stream<Item = Result<ProviderStreamChunk, PersonaError>> + Send>>;

/// Adapter for LLM provider integrations.
///
/// Given a prompt, return text ([`complete`](Self::complete)) or a token
/// stream ([`stream`](Self::stream)).
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, PersonaError>;

    /// Sends a completion request and returns a stream of response chunks.
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, PersonaError>;
}
