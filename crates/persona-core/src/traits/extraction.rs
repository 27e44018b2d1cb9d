// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction stage trait for turning raw media into observations.

use std::path::Path;

use async_trait::async_trait;

use crate::error::PersonaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MemoryKind, Observation};

/// One independent signal extractor (audio transcription, visual description).
///
/// An empty result is graceful degradation ("nothing detected"), not an
/// error. Errors are reserved for the stage itself failing.
#[async_trait]
pub trait ExtractionStage: PluginAdapter {
    /// The memory kind every observation from this stage is filed under.
    fn kind(&self) -> MemoryKind;

    /// Extracts observations from the media file at `media`.
    async fn extract(&self, media: &Path) -> Result<Vec<Observation>, PersonaError>;
}
