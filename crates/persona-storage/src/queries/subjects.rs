// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subject and profile operations.

use chrono::Utc;
use persona_core::{PersonaError, PersonalityProfile, ProfileMutator, Subject};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};
use crate::models::{format_timestamp, parse_timestamp};

fn decode_profile(idx: usize, raw: &str) -> rusqlite::Result<PersonalityProfile> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn encode_profile(profile: &PersonalityProfile) -> rusqlite::Result<String> {
    serde_json::to_string(profile).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Insert a new subject. An existing id is rejected as invalid input.
pub async fn create_subject(db: &Database, subject: &Subject) -> Result<(), PersonaError> {
    let subject = subject.clone();
    let id = subject.id.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let profile = encode_profile(&subject.profile)?;
            let changed = conn.execute(
                "INSERT INTO subjects (id, owner, profile, active_session_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    subject.id,
                    subject.owner,
                    profile,
                    subject.active_session_id,
                    format_timestamp(&subject.created_at),
                    format_timestamp(&subject.updated_at),
                ],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;

    if inserted == 0 {
        return Err(PersonaError::InvalidInput(format!(
            "subject `{id}` already exists"
        )));
    }
    Ok(())
}

/// Get a subject by id.
pub async fn get_subject(db: &Database, id: &str) -> Result<Option<Subject>, PersonaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let subject = conn
                .query_row(
                    "SELECT id, owner, profile, active_session_id, created_at, updated_at
                     FROM subjects WHERE id = ?1",
                    params![id],
                    |row| {
                        let profile: String = row.get(2)?;
                        let created_at: String = row.get(4)?;
                        let updated_at: String = row.get(5)?;
                        Ok(Subject {
                            id: row.get(0)?,
                            owner: row.get(1)?,
                            profile: decode_profile(2, &profile)?,
                            active_session_id: row.get(3)?,
                            created_at: parse_timestamp(4, &created_at)?,
                            updated_at: parse_timestamp(5, &updated_at)?,
                        })
                    },
                )
                .optional()?;
            Ok(subject)
        })
        .await
        .map_err(map_tr_err)
}

/// Get only the profile document of a subject.
pub async fn get_profile(
    db: &Database,
    id: &str,
) -> Result<Option<PersonalityProfile>, PersonaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT profile FROM subjects WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            raw.map(|r| decode_profile(0, &r)).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Read-modify-write of one profile inside an IMMEDIATE transaction.
///
/// The write lock is taken before the read, so concurrent upserts for the
/// same subject apply one after another and never lose an update.
pub async fn upsert_profile(
    db: &Database,
    id: &str,
    mutator: ProfileMutator,
) -> Result<PersonalityProfile, PersonaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let raw: Option<String> = tx
                .query_row(
                    "SELECT profile FROM subjects WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let mut profile = match raw {
                Some(r) => decode_profile(0, &r)?,
                None => PersonalityProfile::default(),
            };

            mutator(&mut profile);

            let now = format_timestamp(&Utc::now());
            tx.execute(
                "INSERT INTO subjects (id, owner, profile, active_session_id, created_at, updated_at)
                 VALUES (?1, NULL, ?2, NULL, ?3, ?3)
                 ON CONFLICT(id) DO UPDATE SET profile = excluded.profile, updated_at = excluded.updated_at",
                params![id, encode_profile(&profile)?, now],
            )?;
            tx.commit()?;
            Ok(profile)
        })
        .await
        .map_err(map_tr_err)
}

/// Set or clear the active chat session of a subject.
pub async fn set_active_session(
    db: &Database,
    id: &str,
    session_id: Option<&str>,
) -> Result<(), PersonaError> {
    let subject_id = id.to_string();
    let session_id = session_id.map(str::to_string);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE subjects SET active_session_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![session_id, format_timestamp(&Utc::now()), subject_id],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(PersonaError::SubjectNotFound(id.to_string()));
    }
    Ok(())
}
