// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Persona workspace.

use thiserror::Error;

/// The primary error type used across all Persona adapter traits and core operations.
#[derive(Debug, Error)]
pub enum PersonaError {
    /// Configuration errors (invalid TOML, missing credentials, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Profile store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM provider errors (API failure, malformed response, stream interruption).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single extraction stage failed. Recoverable at the orchestrator level.
    #[error("{stage} extraction failed: {message}")]
    Extraction { stage: String, message: String },

    /// Neither extraction stage produced a single observation.
    #[error("no usable input: both vision and audio processing produced nothing")]
    NoUsableInput,

    /// The requested subject does not exist.
    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    /// The requested ingestion job does not exist.
    #[error("ingestion job not found: {0}")]
    JobNotFound(String),

    /// An operator response arrived for a session with nothing waiting on it.
    #[error("no pending request found for session {0}")]
    NoPendingRequest(String),

    /// Caller-supplied input was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PersonaError {
    /// Convenience constructor for storage errors from any error type.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true for errors that mean "the thing you asked about is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SubjectNotFound(_) | Self::JobNotFound(_) | Self::NoPendingRequest(_)
        )
    }
}
