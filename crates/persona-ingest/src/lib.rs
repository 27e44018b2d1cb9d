// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline for the Persona workspace.
//!
//! Turns an uploaded video into memory log entries and a merged personality
//! profile. Extraction stages run concurrently and may fail independently;
//! only a run where neither stage produced anything fails the job.

pub mod jobs;
pub mod media;
pub mod merge;
pub mod orchestrator;
pub mod probe;
pub mod stages;
pub mod synthesizer;

pub use jobs::JobRunner;
pub use media::TempMedia;
pub use orchestrator::{IngestReport, IngestionOrchestrator};
pub use stages::{FixtureStage, TranscriptionStage};
pub use synthesizer::StyleSynthesizer;
