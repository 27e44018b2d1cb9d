// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot `register` and `ingest` commands.

use std::path::Path;

use persona_config::PersonaConfig;
use persona_core::PersonaError;
use persona_ingest::IngestReport;
use persona_ingest::media::stage_copy;
use serde_json::json;
use tracing::info;

use crate::services::Services;

/// `persona register`: creates a subject and prints it.
pub async fn register(
    config: &PersonaConfig,
    owner: Option<String>,
    subject_id: Option<String>,
) -> Result<(), PersonaError> {
    let services = Services::build(config).await?;
    let result = services.subjects.register(owner, subject_id).await;
    services.storage.close().await?;

    let subject = result?;
    println!("{}", to_pretty(&subject)?);
    Ok(())
}

/// `persona ingest`: runs the pipeline in the foreground.
///
/// The pipeline works on a staged copy, so `media` is left in place.
pub async fn ingest(
    config: &PersonaConfig,
    subject_id: &str,
    media: &Path,
) -> Result<(), PersonaError> {
    let services = Services::build(config).await?;
    info!(subject_id, media = %media.display(), "ingesting");

    let result = match stage_copy(media).await {
        Ok(staged) => services.orchestrator.ingest(subject_id, staged).await,
        Err(e) => Err(e),
    };
    services.storage.close().await?;

    let report = result?;
    println!("{}", to_pretty(&report_json(&report))?);
    Ok(())
}

fn report_json(report: &IngestReport) -> serde_json::Value {
    json!({
        "subject_id": report.subject_id,
        "recorded_at": report.recorded_at,
        "audio_observations": report.audio_observations,
        "vision_observations": report.vision_observations,
        "profile": report.profile,
    })
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, PersonaError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PersonaError::Internal(format!("cannot render output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> PersonaConfig {
        let toml = format!(
            "[storage]\ndatabase_path = \"{}\"\n",
            dir.path().join("cli.db").to_string_lossy().replace('\\', "/")
        );
        persona_config::load_and_validate_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn missing_media_is_invalid_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config_in(&dir);

        let err = ingest(&config, "alice", &dir.path().join("not-here.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersonaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_subject_keeps_original_media() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config_in(&dir);
        let original = dir.path().join("clip.mp4");
        std::fs::write(&original, b"frames").unwrap();

        let err = ingest(&config, "ghost", &original).await.unwrap_err();
        assert!(matches!(err, PersonaError::SubjectNotFound(_)));
        assert_eq!(std::fs::read(&original).unwrap(), b"frames");
    }
}
