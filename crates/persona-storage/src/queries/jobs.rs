// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion job records.

use chrono::Utc;
use persona_core::{IngestionJob, JobStatus, PersonaError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{format_timestamp, parse_column, parse_optional_timestamp, parse_timestamp};

/// Insert a new job record.
pub async fn create_job(db: &Database, job: &IngestionJob) -> Result<(), PersonaError> {
    let job = job.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO ingestion_jobs (job_id, subject_id, status, error, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    job.job_id,
                    job.subject_id,
                    job.status.to_string(),
                    job.error,
                    format_timestamp(&job.started_at),
                    job.completed_at.as_ref().map(format_timestamp),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a job by id.
pub async fn get_job(db: &Database, job_id: &str) -> Result<Option<IngestionJob>, PersonaError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| {
            let job = conn
                .query_row(
                    "SELECT job_id, subject_id, status, error, started_at, completed_at
                     FROM ingestion_jobs WHERE job_id = ?1",
                    params![job_id],
                    |row| {
                        let status: String = row.get(2)?;
                        let started_at: String = row.get(4)?;
                        Ok(IngestionJob {
                            job_id: row.get(0)?,
                            subject_id: row.get(1)?,
                            status: parse_column::<JobStatus>(2, &status)?,
                            error: row.get(3)?,
                            started_at: parse_timestamp(4, &started_at)?,
                            completed_at: parse_optional_timestamp(5, row.get(5)?)?,
                        })
                    },
                )
                .optional()?;
            Ok(job)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a job to `status`. Terminal states stamp `completed_at` and record `error`.
pub async fn update_job_status(
    db: &Database,
    job_id: &str,
    status: JobStatus,
    error: Option<&str>,
) -> Result<(), PersonaError> {
    let id = job_id.to_string();
    let error = error.map(str::to_string);
    let completed_at = status
        .is_terminal()
        .then(|| format_timestamp(&Utc::now()));
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE ingestion_jobs SET status = ?1, error = ?2, completed_at = ?3
                 WHERE job_id = ?4",
                params![status.to_string(), error, completed_at, id],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(PersonaError::JobNotFound(job_id.to_string()));
    }
    Ok(())
}
