// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion pipeline for one uploaded media file.
//!
//! 1. Stamp the batch with the media's recording time
//! 2. Run the audio and vision stages as two independent tasks
//! 3. Synthesize a style snapshot from whatever came back
//! 4. Fold the snapshot into the stored profile (atomic upsert)
//! 5. Append one memory entry per observation
//!
//! The staged media file is deleted on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use persona_core::{
    ExtractionStage, NewMemory, Observation, PersonaError, PersonalityProfile, StorageAdapter,
};
use tracing::{info, warn};

use crate::media::TempMedia;
use crate::merge;
use crate::probe;
use crate::synthesizer::StyleSynthesizer;

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub subject_id: String,
    /// Timestamp shared by every memory entry written in this run.
    pub recorded_at: DateTime<Utc>,
    pub audio_observations: usize,
    pub vision_observations: usize,
    /// The profile as written by the merge.
    pub profile: PersonalityProfile,
}

pub struct IngestionOrchestrator {
    storage: Arc<dyn StorageAdapter>,
    audio: Arc<dyn ExtractionStage>,
    vision: Arc<dyn ExtractionStage>,
    synthesizer: Arc<StyleSynthesizer>,
    confidence_increment: f64,
}

impl IngestionOrchestrator {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        audio: Arc<dyn ExtractionStage>,
        vision: Arc<dyn ExtractionStage>,
        synthesizer: Arc<StyleSynthesizer>,
        confidence_increment: f64,
    ) -> Self {
        Self {
            storage,
            audio,
            vision,
            synthesizer,
            confidence_increment,
        }
    }

    /// Runs the whole pipeline over a staged copy, consuming it.
    ///
    /// Fails with [`PersonaError::NoUsableInput`] when neither stage produced
    /// an observation; the profile is untouched in that case.
    pub async fn ingest(
        &self,
        subject_id: &str,
        media: TempMedia,
    ) -> Result<IngestReport, PersonaError> {
        if self.storage.get_subject(subject_id).await?.is_none() {
            return Err(PersonaError::SubjectNotFound(subject_id.to_string()));
        }

        let recorded_at = probe::recording_time(media.path()).await;
        let (audio, vision) = self.run_stages(media.path()).await;
        info!(
            subject_id,
            audio = audio.len(),
            vision = vision.len(),
            "extraction complete"
        );

        if audio.is_empty() && vision.is_empty() {
            warn!(subject_id, "both extraction stages produced nothing");
            return Err(PersonaError::NoUsableInput);
        }

        let audio_observations = audio.len();
        let vision_observations = vision.len();
        let mut observations = audio;
        observations.extend(vision);

        let snapshot = self.synthesizer.analyze(&observations).await;

        let increment = self.confidence_increment;
        let profile = self
            .storage
            .upsert_profile(
                subject_id,
                Box::new(move |profile| merge::fold(profile, &snapshot, increment, Utc::now())),
            )
            .await?;

        let entries: Vec<NewMemory> = observations
            .into_iter()
            .map(|o| NewMemory {
                timestamp: recorded_at,
                kind: o.kind,
                session_id: None,
                content: o.text,
            })
            .collect();
        self.storage.append_memories(subject_id, &entries).await?;

        info!(
            subject_id,
            total_sessions = profile.consistency.total_sessions,
            memories = entries.len(),
            "profile updated"
        );

        Ok(IngestReport {
            subject_id: subject_id.to_string(),
            recorded_at,
            audio_observations,
            vision_observations,
            profile,
        })
    }

    /// Runs both stages to completion; a failed stage yields no observations.
    async fn run_stages(&self, media: &Path) -> (Vec<Observation>, Vec<Observation>) {
        let audio = spawn_stage(self.audio.clone(), media.to_path_buf());
        let vision = spawn_stage(self.vision.clone(), media.to_path_buf());
        let (audio, vision) = tokio::join!(audio, vision);

        (
            settle(self.audio.as_ref(), audio),
            settle(self.vision.as_ref(), vision),
        )
    }
}

fn spawn_stage(
    stage: Arc<dyn ExtractionStage>,
    media: PathBuf,
) -> tokio::task::JoinHandle<Result<Vec<Observation>, PersonaError>> {
    tokio::spawn(async move { stage.extract(&media).await })
}

/// Files every observation under the stage's kind; failures degrade to empty.
fn settle(
    stage: &dyn ExtractionStage,
    outcome: Result<Result<Vec<Observation>, PersonaError>, tokio::task::JoinError>,
) -> Vec<Observation> {
    match outcome {
        Ok(Ok(mut observations)) => {
            let kind = stage.kind();
            for observation in &mut observations {
                observation.kind = kind;
            }
            observations
        }
        Ok(Err(e)) => {
            warn!(stage = stage.name(), error = %e, "extraction stage failed");
            Vec::new()
        }
        Err(e) => {
            warn!(stage = stage.name(), error = %e, "extraction stage aborted");
            Vec::new()
        }
    }
}
