// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use persona_config::model::StorageConfig;
use persona_core::{
    AdapterType, HealthStatus, IngestionJob, JobStatus, MemoryEntry, NewMemory, PersonaError,
    PersonalityProfile, PluginAdapter, ProfileMutator, StorageAdapter, Subject,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed profile store.
///
/// The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`]; every other operation fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, PersonaError> {
        self.db.get().ok_or_else(|| PersonaError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), PersonaError> {
        db.connection()
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), PersonaError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| PersonaError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), PersonaError> {
        self.checkpoint(self.db()?).await
    }

    // --- Subjects and profiles ---

    async fn create_subject(&self, subject: &Subject) -> Result<(), PersonaError> {
        queries::subjects::create_subject(self.db()?, subject).await
    }

    async fn get_subject(&self, subject_id: &str) -> Result<Option<Subject>, PersonaError> {
        queries::subjects::get_subject(self.db()?, subject_id).await
    }

    async fn get_profile(
        &self,
        subject_id: &str,
    ) -> Result<Option<PersonalityProfile>, PersonaError> {
        queries::subjects::get_profile(self.db()?, subject_id).await
    }

    async fn upsert_profile(
        &self,
        subject_id: &str,
        mutator: ProfileMutator,
    ) -> Result<PersonalityProfile, PersonaError> {
        queries::subjects::upsert_profile(self.db()?, subject_id, mutator).await
    }

    async fn set_active_session(
        &self,
        subject_id: &str,
        session_id: Option<&str>,
    ) -> Result<(), PersonaError> {
        queries::subjects::set_active_session(self.db()?, subject_id, session_id).await
    }

    // --- Memory log ---

    async fn append_memories(
        &self,
        subject_id: &str,
        entries: &[NewMemory],
    ) -> Result<(), PersonaError> {
        queries::memories::append_memories(self.db()?, subject_id, entries).await
    }

    async fn recent_session_turns(
        &self,
        subject_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, PersonaError> {
        queries::memories::recent_session_turns(self.db()?, subject_id, session_id, limit).await
    }

    async fn find_memories_outside_session(
        &self,
        subject_id: &str,
        session_id: &str,
        needles: &[String],
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, PersonaError> {
        queries::memories::find_outside_session(self.db()?, subject_id, session_id, needles, limit)
            .await
    }

    async fn latest_activity(
        &self,
        subject_id: &str,
    ) -> Result<Option<MemoryEntry>, PersonaError> {
        queries::memories::latest_activity(self.db()?, subject_id).await
    }

    async fn search_memories(
        &self,
        subject_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, PersonaError> {
        queries::memories::search_memories(self.db()?, subject_id, query).await
    }

    // --- Ingestion jobs ---

    async fn create_job(&self, job: &IngestionJob) -> Result<(), PersonaError> {
        queries::jobs::create_job(self.db()?, job).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<IngestionJob>, PersonaError> {
        queries::jobs::get_job(self.db()?, job_id).await
    }

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<(), PersonaError> {
        queries::jobs::update_job_status(self.db()?, job_id, status, error).await
    }
}
