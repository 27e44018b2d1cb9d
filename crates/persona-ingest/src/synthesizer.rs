// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Style synthesis: one LLM call turning a batch of observations into a
//! [`ProfileSnapshot`].
//!
//! Synthesis never fails outward. Without a provider a fixed mock snapshot
//! is returned; on any provider or parse failure a zero-confidence fallback
//! snapshot is returned instead.

use std::sync::Arc;

use persona_core::{
    MemoryKind, Observation, ProfileSnapshot, ProviderAdapter, ProviderMessage, ProviderRequest,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::merge::UNKNOWN_DIALECT;

/// Confidence assumed when the model omits its self-reported confidence.
const DEFAULT_REPORTED_CONFIDENCE: f64 = 0.8;

const ANALYST_PROMPT: &str = r#"You are an expert behavioral analyst. Analyze the provided video transcripts and visual logs to construct a personality profile. Focus on speech patterns (identifying dialects, filler words), recurring physical actions, and general demeanor. Output JSON.

Respond with a single JSON object and nothing else:
{
  "traits": [string],
  "commonPhrases": [string],          // phrases the person repeats often
  "fillerWordFrequency": number,      // 0-1 scale of how often they use fillers
  "speechRate": "Slow" | "Moderate" | "Fast",
  "dialect": string,                  // detected dialect or accent
  "confidenceScore": number           // 0-1 confidence in this analysis
}"#;

/// Wire shape of the model's answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotPayload {
    traits: Vec<String>,
    common_phrases: Vec<String>,
    filler_word_frequency: f64,
    speech_rate: String,
    dialect: String,
    #[serde(default)]
    confidence_score: Option<f64>,
}

/// Builds profile snapshots from extracted observations.
pub struct StyleSynthesizer {
    provider: Option<Arc<dyn ProviderAdapter>>,
    model: String,
    max_tokens: u32,
}

impl StyleSynthesizer {
    /// `provider` is `None` in mock mode.
    pub fn new(provider: Option<Arc<dyn ProviderAdapter>>, model: String, max_tokens: u32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
        }
    }

    /// Analyzes one batch of observations. Depends only on its input.
    pub async fn analyze(&self, observations: &[Observation]) -> ProfileSnapshot {
        let Some(provider) = &self.provider else {
            info!("no provider configured, using mock style analysis");
            return mock_snapshot();
        };

        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(ANALYST_PROMPT.to_string()),
            messages: vec![ProviderMessage::user(render_observations(observations))],
            max_tokens: self.max_tokens,
            stream: false,
        };

        match provider.complete(request).await {
            Ok(response) => match parse_snapshot(&response.content) {
                Some(snapshot) => {
                    debug!(
                        traits = snapshot.traits.len(),
                        confidence = snapshot.confidence_score,
                        "style analysis complete"
                    );
                    snapshot
                }
                None => {
                    warn!("style analysis returned no usable profile, using fallback");
                    fallback_snapshot()
                }
            },
            Err(e) => {
                warn!(error = %e, "style analysis failed, using fallback");
                fallback_snapshot()
            }
        }
    }
}

/// Renders observations grouped by kind, each group in offset order.
pub fn render_observations(observations: &[Observation]) -> String {
    let section = |kind: MemoryKind| {
        let mut lines: Vec<&Observation> =
            observations.iter().filter(|o| o.kind == kind).collect();
        lines.sort_by(|a, b| {
            a.offset_secs
                .unwrap_or(0.0)
                .total_cmp(&b.offset_secs.unwrap_or(0.0))
        });
        lines
            .iter()
            .map(|o| match o.offset_secs {
                Some(secs) => format!("[{secs:.1}s] {}", o.text),
                None => format!("[-] {}", o.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "AUDIO TRANSCRIPTS:\n{}\n\nVISUAL CONTEXT:\n{}",
        section(MemoryKind::Audio),
        section(MemoryKind::Vision)
    )
}

/// Extracts the first JSON object from `response`, tolerating code fences
/// and surrounding prose.
pub fn parse_snapshot(response: &str) -> Option<ProfileSnapshot> {
    let trimmed = response.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<SnapshotPayload>(&trimmed[start..=end]) {
        Ok(payload) => Some(ProfileSnapshot {
            traits: payload.traits,
            common_phrases: payload.common_phrases,
            filler_word_frequency: payload.filler_word_frequency.clamp(0.0, 1.0),
            speech_rate: payload.speech_rate,
            dialect: payload.dialect,
            confidence_score: payload
                .confidence_score
                .unwrap_or(DEFAULT_REPORTED_CONFIDENCE)
                .clamp(0.0, 1.0),
        }),
        Err(e) => {
            warn!("failed to parse style analysis: {e}");
            debug!("raw response: {response}");
            None
        }
    }
}

/// Deterministic snapshot used when no provider is configured.
pub fn mock_snapshot() -> ProfileSnapshot {
    ProfileSnapshot {
        traits: vec!["Casual".into(), "Observant".into(), "Energetic".into()],
        common_phrases: vec!["you know".into(), "basically".into()],
        filler_word_frequency: 0.4,
        speech_rate: "Moderate".into(),
        dialect: "General American (California influence)".into(),
        confidence_score: 0.5,
    }
}

/// Minimal zero-confidence snapshot returned when analysis fails.
pub fn fallback_snapshot() -> ProfileSnapshot {
    ProfileSnapshot {
        traits: vec!["Unknown".into()],
        common_phrases: Vec::new(),
        filler_word_frequency: 0.0,
        speech_rate: "Unknown".into(),
        dialect: UNKNOWN_DIALECT.into(),
        confidence_score: 0.0,
    }
}
