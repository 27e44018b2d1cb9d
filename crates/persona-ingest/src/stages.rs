// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction stage implementations.
//!
//! - [`TranscriptionStage`]: OpenAI-compatible speech-to-text endpoint
//! - [`FixtureStage`]: fixed observations for unconfigured backends

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use persona_config::model::TranscriptionConfig;
use persona_core::{
    AdapterType, ExtractionStage, HealthStatus, MemoryKind, Observation, PersonaError,
    PluginAdapter,
};
use serde::Deserialize;
use tracing::{debug, info};

const FIXTURE_TRANSCRIPT: [&str; 2] = [
    "Um, hi, I'm just walking to the store.",
    "It's pretty sunny out here, you know?",
];

const FIXTURE_VISUALS: [&str; 2] = [
    "User is typing on a keyboard (Simulated)",
    "User is looking at a computer screen (Simulated)",
];

/// Deterministic stage that ignores the media and returns fixed observations.
pub struct FixtureStage {
    name: &'static str,
    kind: MemoryKind,
    lines: Vec<String>,
}

impl FixtureStage {
    pub fn audio() -> Self {
        Self::new("fixture-audio", MemoryKind::Audio, FIXTURE_TRANSCRIPT)
    }

    pub fn vision() -> Self {
        Self::new("fixture-vision", MemoryKind::Vision, FIXTURE_VISUALS)
    }

    pub fn new<I, S>(name: &'static str, kind: MemoryKind, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            kind,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl PluginAdapter for FixtureStage {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extraction
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        Ok(())
    }
}

#[async_trait]
impl ExtractionStage for FixtureStage {
    fn kind(&self) -> MemoryKind {
        self.kind
    }

    async fn extract(&self, media: &Path) -> Result<Vec<Observation>, PersonaError> {
        debug!(stage = self.name, path = %media.display(), "using fixture observations");
        Ok(self
            .lines
            .iter()
            .map(|line| Observation::new(self.kind, line.clone()))
            .collect())
    }
}

/// `verbose_json` transcription response. Only the fields we read.
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<TranscriptionSegment>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionSegment {
    #[serde(default)]
    start: f64,
    text: String,
}

/// Audio stage backed by an OpenAI-compatible `/audio/transcriptions` endpoint.
///
/// The media file is uploaded as-is; each returned segment becomes one
/// audio observation offset by the segment start.
pub struct TranscriptionStage {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl TranscriptionStage {
    pub fn new(config: &TranscriptionConfig, api_key: String) -> Result<Self, PersonaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| PersonaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Builds the stage when an API key resolves (config, then `OPENAI_API_KEY`).
    pub fn from_config(config: &TranscriptionConfig) -> Result<Option<Self>, PersonaError> {
        let key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()));
        match key {
            Some(key) => {
                info!(endpoint = %config.endpoint, model = %config.model, "transcription stage enabled");
                Self::new(config, key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn failure(message: String) -> PersonaError {
        PersonaError::Extraction {
            stage: "audio".into(),
            message,
        }
    }
}

#[async_trait]
impl PluginAdapter for TranscriptionStage {
    fn name(&self) -> &str {
        "transcription"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extraction
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        Ok(())
    }
}

#[async_trait]
impl ExtractionStage for TranscriptionStage {
    fn kind(&self) -> MemoryKind {
        MemoryKind::Audio
    }

    async fn extract(&self, media: &Path) -> Result<Vec<Observation>, PersonaError> {
        let bytes = tokio::fs::read(media)
            .await
            .map_err(|e| Self::failure(format!("cannot read {}: {e}", media.display())))?;
        let file_name = media
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media.mp4".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| Self::failure(format!("MIME error: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Self::failure(format!("transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::failure(format!("transcription API error ({status}): {body}")));
        }

        let transcription: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("transcription JSON parse error: {e}")))?;

        let observations = to_observations(transcription);
        debug!(segments = observations.len(), "transcription complete");
        Ok(observations)
    }
}

fn to_observations(transcription: VerboseTranscription) -> Vec<Observation> {
    let segments: Vec<Observation> = transcription
        .segments
        .into_iter()
        .filter_map(|seg| {
            let text = seg.text.trim();
            (!text.is_empty()).then(|| Observation::new(MemoryKind::Audio, text).at(seg.start))
        })
        .collect();

    if segments.is_empty() && !transcription.text.trim().is_empty() {
        return vec![Observation::new(MemoryKind::Audio, transcription.text.trim())];
    }
    segments
}
