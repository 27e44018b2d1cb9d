// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Persona workspace.
//!
//! This crate provides the error type, the domain model (profiles, memory
//! log, ingestion jobs), and the adapter traits that the storage, provider,
//! and extraction backends implement.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PersonaError;
pub use types::{
    AdapterType, ConsistencyMetrics, HealthStatus, IngestionJob, JobStatus, MemoryEntry,
    MemoryKind, NewMemory, Observation, PersonalityProfile, ProfileSnapshot, ProviderMessage,
    ProviderRequest, ProviderResponse, ProviderStreamChunk, StreamEventType, Subject, TokenUsage,
    TurnRole,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    ExtractionStage, PluginAdapter, ProfileMutator, ProviderAdapter, ProviderStream,
    StorageAdapter,
};
