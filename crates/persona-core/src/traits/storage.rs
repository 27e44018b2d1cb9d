// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the profile store.

use async_trait::async_trait;

use crate::error::PersonaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    IngestionJob, JobStatus, MemoryEntry, NewMemory, PersonalityProfile, Subject,
};

/// Closure applied to a profile inside the store's read-modify-write critical section.
pub type ProfileMutator = Box<dyn FnOnce(&mut PersonalityProfile) + Send + 'static>;

/// Adapter for the profile store.
///
/// Holds one profile and one append-only memory log per subject, plus the
/// ingestion job records. Memory entries are never edited or deleted.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), PersonaError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), PersonaError>;

    // --- Subjects and profiles ---

    /// Creates a subject with the given (usually default) profile.
    async fn create_subject(&self, subject: &Subject) -> Result<(), PersonaError>;

    async fn get_subject(&self, subject_id: &str) -> Result<Option<Subject>, PersonaError>;

    async fn get_profile(
        &self,
        subject_id: &str,
    ) -> Result<Option<PersonalityProfile>, PersonaError>;

    /// Atomically reads the profile, applies `mutator`, and writes it back.
    ///
    /// A subject without a stored profile starts from the default profile.
    /// Returns the profile as written.
    async fn upsert_profile(
        &self,
        subject_id: &str,
        mutator: ProfileMutator,
    ) -> Result<PersonalityProfile, PersonaError>;

    /// Sets or clears the subject's active chat session.
    async fn set_active_session(
        &self,
        subject_id: &str,
        session_id: Option<&str>,
    ) -> Result<(), PersonaError>;

    // --- Memory log ---

    /// Appends all `entries` to the subject's log in one batch, in order.
    ///
    /// Fails with `InvalidInput`, writing nothing, when a timestamp falls
    /// outside years 0..=9999.
    async fn append_memories(
        &self,
        subject_id: &str,
        entries: &[NewMemory],
    ) -> Result<(), PersonaError>;

    /// The newest `limit` text entries of one session, oldest first.
    async fn recent_session_turns(
        &self,
        subject_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, PersonaError>;

    /// Up to `limit` entries outside `session_id` whose content contains any
    /// of `needles` (case-sensitive), in scan order.
    async fn find_memories_outside_session(
        &self,
        subject_id: &str,
        session_id: &str,
        needles: &[String],
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, PersonaError>;

    /// The most recent audio or vision entry across the whole log.
    async fn latest_activity(&self, subject_id: &str)
    -> Result<Option<MemoryEntry>, PersonaError>;

    /// Entries whose content contains `query` (all entries when `None`), in scan order.
    async fn search_memories(
        &self,
        subject_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, PersonaError>;

    // --- Ingestion jobs ---

    async fn create_job(&self, job: &IngestionJob) -> Result<(), PersonaError>;

    async fn get_job(&self, job_id: &str) -> Result<Option<IngestionJob>, PersonaError>;

    /// Moves a job to `status`; terminal states also record `error` and the completion time.
    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<(), PersonaError>;
}
