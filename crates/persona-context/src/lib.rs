// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grounding context for persona replies.
//!
//! The [`ContextAssembler`] reads the profile store and gathers three things
//! for a reply:
//! - **Recent history**: the last turns of the current session, oldest first
//! - **Relevant memories**: keyword-matched entries from outside the session
//! - **Latest activity**: the newest audio or vision entry in the whole log
//!
//! The [`prompt`] module turns an [`AssembledContext`] into system prompts
//! and provider messages.

pub mod prompt;

use std::sync::Arc;

use persona_core::{MemoryEntry, PersonaError, PersonalityProfile, StorageAdapter};
use tracing::debug;

pub use prompt::{
    history_to_messages, persona_system_prompt, rewrite_system_prompt, rewrite_user_message,
};

/// Sliding window of session turns sent with every reply.
pub const RECENT_HISTORY_LIMIT: usize = 10;

/// Maximum number of long-term memories pulled in by keyword match.
pub const RELEVANT_MEMORY_LIMIT: usize = 3;

/// Tokens must be longer than this many characters to count as significant.
const SIGNIFICANT_TOKEN_MIN_LEN: usize = 4;

/// Everything a reply is grounded on.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub profile: PersonalityProfile,
    /// At most [`RECENT_HISTORY_LIMIT`] text turns, timestamp ascending.
    pub recent_history: Vec<MemoryEntry>,
    /// At most [`RELEVANT_MEMORY_LIMIT`] entries, in log scan order.
    pub relevant_memories: Vec<MemoryEntry>,
    pub latest_activity: Option<MemoryEntry>,
}

/// Read-only view over the profile store that builds [`AssembledContext`]s.
pub struct ContextAssembler {
    storage: Arc<dyn StorageAdapter>,
}

impl ContextAssembler {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Assembles the grounding context for a reply to `user_text`.
    ///
    /// Fails with [`PersonaError::SubjectNotFound`] for an unknown subject.
    /// Never writes to the store.
    pub async fn assemble(
        &self,
        subject_id: &str,
        session_id: &str,
        user_text: &str,
    ) -> Result<AssembledContext, PersonaError> {
        let profile = self.profile(subject_id).await?;

        let recent_history = self
            .storage
            .recent_session_turns(subject_id, session_id, RECENT_HISTORY_LIMIT)
            .await?;

        let keywords = significant_tokens(user_text);
        let relevant_memories = self
            .storage
            .find_memories_outside_session(
                subject_id,
                session_id,
                &keywords,
                RELEVANT_MEMORY_LIMIT,
            )
            .await?;

        let latest_activity = self.storage.latest_activity(subject_id).await?;

        debug!(
            subject_id,
            session_id,
            history = recent_history.len(),
            keywords = keywords.len(),
            relevant = relevant_memories.len(),
            has_activity = latest_activity.is_some(),
            "context assembled"
        );

        Ok(AssembledContext {
            profile,
            recent_history,
            relevant_memories,
            latest_activity,
        })
    }

    /// Profile and latest activity only, for the guided rewrite path.
    pub async fn persona_state(
        &self,
        subject_id: &str,
    ) -> Result<(PersonalityProfile, Option<MemoryEntry>), PersonaError> {
        let profile = self.profile(subject_id).await?;
        let latest_activity = self.storage.latest_activity(subject_id).await?;
        Ok((profile, latest_activity))
    }

    async fn profile(&self, subject_id: &str) -> Result<PersonalityProfile, PersonaError> {
        self.storage
            .get_profile(subject_id)
            .await?
            .ok_or_else(|| PersonaError::SubjectNotFound(subject_id.to_string()))
    }
}

/// Whitespace-separated tokens longer than four characters, deduplicated
/// in first-seen order. Matching is case-sensitive and punctuation is kept.
pub fn significant_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        if token.chars().count() > SIGNIFICANT_TOKEN_MIN_LEN
            && !tokens.iter().any(|t| t == token)
        {
            tokens.push(token.to_string());
        }
    }
    tokens
}
