// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires the service graph from configuration.

use std::sync::Arc;

use persona_agent::{HumanLoopCorrelator, ResponseEngine, ResponseSettings, SubjectDirectory};
use persona_anthropic::AnthropicProvider;
use persona_config::PersonaConfig;
use persona_core::{ExtractionStage, PersonaError, ProviderAdapter, StorageAdapter};
use persona_ingest::{
    FixtureStage, IngestionOrchestrator, JobRunner, StyleSynthesizer, TranscriptionStage,
};
use persona_storage::SqliteStorage;
use tracing::{info, warn};

/// Everything the commands need, built once per process.
pub struct Services {
    pub storage: Arc<dyn StorageAdapter>,
    pub subjects: Arc<SubjectDirectory>,
    pub engine: Arc<ResponseEngine>,
    pub correlator: Arc<HumanLoopCorrelator>,
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub jobs: Arc<JobRunner>,
}

impl Services {
    pub async fn build(config: &PersonaConfig) -> Result<Self, PersonaError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        info!(path = %config.storage.database_path, "storage initialized");
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let provider = match AnthropicProvider::from_config(config)? {
            Some(provider) => {
                let provider: Arc<dyn ProviderAdapter> = Arc::new(provider);
                Some(provider)
            }
            None => {
                warn!("no Anthropic API key configured, replies and style analysis run in mock mode");
                None
            }
        };

        let audio: Arc<dyn ExtractionStage> =
            match TranscriptionStage::from_config(&config.transcription)? {
                Some(stage) => Arc::new(stage),
                None => {
                    warn!("no transcription API key configured, using fixture transcripts");
                    Arc::new(FixtureStage::audio())
                }
            };
        let vision: Arc<dyn ExtractionStage> = Arc::new(FixtureStage::vision());

        let synthesizer = Arc::new(StyleSynthesizer::new(
            provider.clone(),
            config.anthropic.default_model.clone(),
            config.anthropic.max_tokens,
        ));
        let orchestrator = Arc::new(IngestionOrchestrator::new(
            storage.clone(),
            audio,
            vision,
            synthesizer,
            config.ingestion.confidence_increment,
        ));
        let jobs = Arc::new(JobRunner::new(storage.clone(), orchestrator.clone()));

        let engine = Arc::new(ResponseEngine::new(
            storage.clone(),
            provider,
            ResponseSettings::from_config(config),
        ));
        let correlator = Arc::new(HumanLoopCorrelator::new(engine.clone()));
        let subjects = Arc::new(SubjectDirectory::new(storage.clone()));

        Ok(Self {
            storage,
            subjects,
            engine,
            correlator,
            orchestrator,
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> PersonaConfig {
        let db = dir.path().join("nested").join("persona.db");
        let toml = format!(
            "[storage]\ndatabase_path = \"{}\"\n",
            db.to_string_lossy().replace('\\', "/")
        );
        persona_config::load_and_validate_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn builds_storage_under_missing_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config_in(&dir);

        let services = Services::build(&config).await.unwrap();
        assert!(dir.path().join("nested").join("persona.db").exists());

        let subject = services
            .subjects
            .register(None, Some("alice".to_string()))
            .await
            .unwrap();
        assert_eq!(subject.id, "alice");
        services.storage.close().await.unwrap();
    }
}
