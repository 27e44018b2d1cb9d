// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Persona crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Dialect reported for a subject whose dialect has not been established yet.
pub const DEFAULT_DIALECT: &str = "General American";

/// Speech rate of a freshly registered subject.
pub const DEFAULT_SPEECH_RATE: &str = "Moderate";

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Extraction,
}

// --- Memory log ---

/// Category of a memory log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// A transcript line from the audio stage.
    Audio,
    /// A visual description from the vision stage.
    Vision,
    /// A conversational turn.
    Text,
}

impl MemoryKind {
    /// Audio and vision entries describe what the subject was doing.
    pub fn is_activity(self) -> bool {
        matches!(self, Self::Audio | Self::Vision)
    }
}

/// A persisted, immutable memory log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Monotonic insertion sequence; defines scan order.
    pub seq: i64,
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MemoryKind,
    /// Present for `text` entries; groups conversational turns.
    pub session_id: Option<String>,
    pub content: String,
}

/// A memory entry about to be appended to a subject's log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub timestamp: DateTime<Utc>,
    pub kind: MemoryKind,
    pub session_id: Option<String>,
    pub content: String,
}

impl NewMemory {
    /// A conversational turn stamped with the current time.
    pub fn turn(session_id: &str, content: String) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: MemoryKind::Text,
            session_id: Some(session_id.to_string()),
            content,
        }
    }
}

/// Who produced a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Avatar,
}

impl TurnRole {
    /// Prefix written in front of the turn content in the memory log.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Avatar => "Avatar",
        }
    }

    /// Formats `content` the way turns of this role are stored.
    pub fn format(self, content: &str) -> String {
        format!("{}: {content}", self.prefix())
    }
}

// --- Extraction ---

/// One unit of extracted signal produced by an extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: MemoryKind,
    pub text: String,
    /// Offset into the media in seconds, when the backend reports one.
    pub offset_secs: Option<f64>,
}

impl Observation {
    pub fn new(kind: MemoryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            offset_secs: None,
        }
    }

    pub fn at(mut self, offset_secs: f64) -> Self {
        self.offset_secs = Some(offset_secs);
        self
    }
}

// --- Profile ---

/// Bookkeeping for how much data backs a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyMetrics {
    /// Completed ingestion jobs merged into the profile.
    pub total_sessions: u32,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Long-lived aggregate personality profile of one subject.
///
/// Mutated only by folding [`ProfileSnapshot`]s into it. A profile with
/// `total_sessions == 0` has never been observed and carries the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    /// Union of every trait ever observed, in first-seen order.
    pub traits: Vec<String>,
    /// Union of every phrase ever observed, in first-seen order.
    pub common_phrases: Vec<String>,
    /// Running weighted mean in [0, 1].
    pub filler_word_frequency: f64,
    /// Latest observed value.
    pub speech_rate: String,
    /// First established value; `None` until a session reports one.
    pub dialect: Option<String>,
    /// Non-decreasing, capped at 1.0.
    pub confidence_score: f64,
    pub consistency: ConsistencyMetrics,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            traits: Vec::new(),
            common_phrases: Vec::new(),
            filler_word_frequency: 0.0,
            speech_rate: DEFAULT_SPEECH_RATE.to_string(),
            dialect: None,
            confidence_score: 0.0,
            consistency: ConsistencyMetrics::default(),
        }
    }
}

impl PersonalityProfile {
    /// The dialect to speak in, falling back to the default for unobserved subjects.
    pub fn effective_dialect(&self) -> &str {
        self.dialect.as_deref().unwrap_or(DEFAULT_DIALECT)
    }
}

/// Output of one style synthesis run, not yet merged into a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub traits: Vec<String>,
    pub common_phrases: Vec<String>,
    pub filler_word_frequency: f64,
    pub speech_rate: String,
    pub dialect: String,
    pub confidence_score: f64,
}

/// A modeled person: owner, profile, and chat session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub owner: Option<String>,
    pub profile: PersonalityProfile,
    pub active_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Ingestion jobs ---

/// Lifecycle state of an ingestion job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One media upload's trip through the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionJob {
    pub job_id: String,
    pub subject_id: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// --- Provider types ---

/// A single message in a provider conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ProviderMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A request to an LLM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A full response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

/// Kind of event carried by a [`ProviderStreamChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventType {
    MessageStart,
    ContentBlockDelta,
    MessageDelta,
    MessageStop,
    Error,
}

/// A single chunk from a streaming provider response.
#[derive(Debug, Clone)]
pub struct ProviderStreamChunk {
    pub event_type: StreamEventType,
    pub text: Option<String>,
    pub usage: Option<TokenUsage>,
    pub error: Option<String>,
    pub stop_reason: Option<String>,
}

impl ProviderStreamChunk {
    /// A text delta chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            event_type: StreamEventType::ContentBlockDelta,
            text: Some(text.into()),
            usage: None,
            error: None,
            stop_reason: None,
        }
    }
}
