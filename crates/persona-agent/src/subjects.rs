// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subject registration and lookup.

use std::sync::Arc;

use chrono::Utc;
use persona_core::{MemoryEntry, PersonaError, PersonalityProfile, StorageAdapter, Subject};
use tracing::info;

pub struct SubjectDirectory {
    storage: Arc<dyn StorageAdapter>,
}

impl SubjectDirectory {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Creates a subject with an empty profile.
    ///
    /// A missing `subject_id` is replaced by a fresh UUID. Registering an
    /// existing id fails with [`PersonaError::InvalidInput`].
    pub async fn register(
        &self,
        owner: Option<String>,
        subject_id: Option<String>,
    ) -> Result<Subject, PersonaError> {
        let id = match subject_id.map(|id| id.trim().to_string()) {
            Some(id) if id.is_empty() => {
                return Err(PersonaError::InvalidInput("subject id must not be empty".into()));
            }
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };

        let now = Utc::now();
        let subject = Subject {
            id,
            owner: owner.filter(|o| !o.trim().is_empty()),
            profile: PersonalityProfile::default(),
            active_session_id: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_subject(&subject).await?;
        info!(subject_id = %subject.id, "subject registered");
        Ok(subject)
    }

    pub async fn get(&self, subject_id: &str) -> Result<Subject, PersonaError> {
        self.storage
            .get_subject(subject_id)
            .await?
            .ok_or_else(|| PersonaError::SubjectNotFound(subject_id.to_string()))
    }

    /// The subject's memory log, optionally narrowed to entries containing `query`.
    pub async fn search_memory(
        &self,
        subject_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, PersonaError> {
        self.get(subject_id).await?;
        let query = query.filter(|q| !q.is_empty());
        self.storage.search_memories(subject_id, query).await
    }
}

#[cfg(test)]
mod tests {
    use persona_core::{MemoryKind, NewMemory};

    use super::*;
    use crate::engine::tests::storage_with_subject;

    #[tokio::test]
    async fn register_defaults_id_and_empty_profile() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let directory = SubjectDirectory::new(storage);

        let subject = directory.register(Some("ops".into()), None).await.unwrap();
        assert!(uuid::Uuid::parse_str(&subject.id).is_ok());
        assert_eq!(subject.owner.as_deref(), Some("ops"));
        assert_eq!(subject.profile.consistency.total_sessions, 0);
        assert_eq!(subject.profile.effective_dialect(), "General American");

        let stored = directory.get(&subject.id).await.unwrap();
        assert_eq!(stored.id, subject.id);
    }

    #[tokio::test]
    async fn duplicate_and_blank_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let directory = SubjectDirectory::new(storage);

        let err = directory.register(None, Some("alice".into())).await.unwrap_err();
        assert!(matches!(err, PersonaError::InvalidInput(_)));
        let err = directory.register(None, Some("  ".into())).await.unwrap_err();
        assert!(matches!(err, PersonaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn search_filters_by_substring() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        storage
            .append_memories(
                "alice",
                &[
                    NewMemory::turn("s1", "User: the beach was great".into()),
                    NewMemory {
                        timestamp: Utc::now(),
                        kind: MemoryKind::Vision,
                        session_id: None,
                        content: "Walking on the beach".into(),
                    },
                    NewMemory::turn("s1", "Avatar: sounds fun".into()),
                ],
            )
            .await
            .unwrap();
        let directory = SubjectDirectory::new(storage);

        assert_eq!(directory.search_memory("alice", None).await.unwrap().len(), 3);
        let hits = directory.search_memory("alice", Some("beach")).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(directory.search_memory("alice", Some("Beach")).await.unwrap().is_empty());

        let err = directory.search_memory("bob", None).await.unwrap_err();
        assert!(matches!(err, PersonaError::SubjectNotFound(_)));
    }
}
