// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only memory log operations.

use persona_core::{MemoryEntry, NewMemory, PersonaError};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{ensure_storable, format_timestamp, parse_column, parse_timestamp};

const ENTRY_COLUMNS: &str = "seq, subject_id, timestamp, kind, session_id, content";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
    let timestamp: String = row.get(2)?;
    let kind: String = row.get(3)?;
    Ok(MemoryEntry {
        seq: row.get(0)?,
        subject_id: row.get(1)?,
        timestamp: parse_timestamp(2, &timestamp)?,
        kind: parse_column(3, &kind)?,
        session_id: row.get(4)?,
        content: row.get(5)?,
    })
}

/// Append a batch of entries in one transaction, preserving slice order.
///
/// The whole batch is rejected when any timestamp is outside the storable
/// range; nothing is written in that case.
pub async fn append_memories(
    db: &Database,
    subject_id: &str,
    entries: &[NewMemory],
) -> Result<(), PersonaError> {
    if entries.is_empty() {
        return Ok(());
    }
    for entry in entries {
        ensure_storable(&entry.timestamp)?;
    }
    let subject_id = subject_id.to_string();
    let entries = entries.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO memories (subject_id, timestamp, kind, session_id, content)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for entry in &entries {
                    stmt.execute(params![
                        subject_id,
                        format_timestamp(&entry.timestamp),
                        entry.kind.to_string(),
                        entry.session_id,
                        entry.content,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` text entries of one session, returned oldest first.
pub async fn recent_session_turns(
    db: &Database,
    subject_id: &str,
    session_id: &str,
    limit: usize,
) -> Result<Vec<MemoryEntry>, PersonaError> {
    let subject_id = subject_id.to_string();
    let session_id = session_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut entries = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM memories
                 WHERE subject_id = ?1 AND session_id = ?2 AND kind = 'text'
                 ORDER BY timestamp DESC, seq DESC LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(params![subject_id, session_id, limit], row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;
    entries.reverse();
    Ok(entries)
}

/// Entries outside `session_id` containing any of `needles`, in scan order.
pub async fn find_outside_session(
    db: &Database,
    subject_id: &str,
    session_id: &str,
    needles: &[String],
    limit: usize,
) -> Result<Vec<MemoryEntry>, PersonaError> {
    if needles.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    // ?1 subject, ?2 session, ?3.. needles
    let matches = (0..needles.len())
        .map(|i| format!("instr(content, ?{}) > 0", i + 3))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM memories
         WHERE subject_id = ?1 AND (session_id IS NULL OR session_id != ?2) AND ({matches})
         ORDER BY seq ASC LIMIT {limit}"
    );

    let mut bind = Vec::with_capacity(needles.len() + 2);
    bind.push(subject_id.to_string());
    bind.push(session_id.to_string());
    bind.extend(needles.iter().cloned());

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(bind.iter()), row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent audio or vision entry across the subject's whole log.
pub async fn latest_activity(
    db: &Database,
    subject_id: &str,
) -> Result<Option<MemoryEntry>, PersonaError> {
    let subject_id = subject_id.to_string();
    db.connection()
        .call(move |conn| {
            let entry = conn
                .query_row(
                    &format!(
                        "SELECT {ENTRY_COLUMNS} FROM memories
                         WHERE subject_id = ?1 AND kind IN ('audio', 'vision')
                         ORDER BY timestamp DESC, seq DESC LIMIT 1"
                    ),
                    params![subject_id],
                    row_to_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
        .map_err(map_tr_err)
}

/// Every entry of the subject (optionally containing `query`), in scan order.
pub async fn search_memories(
    db: &Database,
    subject_id: &str,
    query: Option<&str>,
) -> Result<Vec<MemoryEntry>, PersonaError> {
    let subject_id = subject_id.to_string();
    let query = query.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let rows = match &query {
                Some(q) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {ENTRY_COLUMNS} FROM memories
                         WHERE subject_id = ?1 AND instr(content, ?2) > 0 ORDER BY seq ASC"
                    ))?;
                    let found = stmt
                        .query_map(params![subject_id, q], row_to_entry)?
                        .collect::<Result<Vec<_>, _>>()?;
                    found
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {ENTRY_COLUMNS} FROM memories WHERE subject_id = ?1 ORDER BY seq ASC"
                    ))?;
                    let all = stmt
                        .query_map(params![subject_id], row_to_entry)?
                        .collect::<Result<Vec<_>, _>>()?;
                    all
                }
            };
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
