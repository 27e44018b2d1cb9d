// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background ingestion jobs.
//!
//! A job is persisted as `pending` before any work starts, then driven
//! through `processing` to `completed` or `failed` by a spawned task.
//! Failed jobs are terminal and never retried.
//!
//! The submitted file is copied before the job is accepted; the job works
//! on, and deletes, only that copy.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use persona_core::{IngestionJob, JobStatus, PersonaError, StorageAdapter};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::media::{self, TempMedia};
use crate::orchestrator::IngestionOrchestrator;

pub struct JobRunner {
    storage: Arc<dyn StorageAdapter>,
    orchestrator: Arc<IngestionOrchestrator>,
    tasks: TaskTracker,
}

impl JobRunner {
    pub fn new(storage: Arc<dyn StorageAdapter>, orchestrator: Arc<IngestionOrchestrator>) -> Self {
        Self {
            storage,
            orchestrator,
            tasks: TaskTracker::new(),
        }
    }

    /// Stages a copy of `source`, records a pending job for it and starts
    /// processing it.
    ///
    /// Returns as soon as the job is persisted. `source` is left untouched.
    pub async fn submit(
        &self,
        subject_id: &str,
        source: &Path,
    ) -> Result<IngestionJob, PersonaError> {
        if self.storage.get_subject(subject_id).await?.is_none() {
            return Err(PersonaError::SubjectNotFound(subject_id.to_string()));
        }
        let staged = media::stage_copy(source).await?;

        let job = IngestionJob {
            job_id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            status: JobStatus::Pending,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.storage.create_job(&job).await?;
        info!(job_id = %job.job_id, subject_id, "ingestion job accepted");

        let storage = self.storage.clone();
        let orchestrator = self.orchestrator.clone();
        let job_id = job.job_id.clone();
        let subject_id = subject_id.to_string();
        self.tasks.spawn(async move {
            run_job(storage, orchestrator, job_id, subject_id, staged).await;
        });

        Ok(job)
    }

    pub async fn status(&self, job_id: &str) -> Result<IngestionJob, PersonaError> {
        self.storage
            .get_job(job_id)
            .await?
            .ok_or_else(|| PersonaError::JobNotFound(job_id.to_string()))
    }

    /// Stops accepting tracked work and waits for running jobs to finish.
    pub async fn drain(&self) {
        self.tasks.close();
        if !self.tasks.is_empty() {
            info!(running = self.tasks.len(), "waiting for ingestion jobs");
        }
        self.tasks.wait().await;
    }
}

async fn run_job(
    storage: Arc<dyn StorageAdapter>,
    orchestrator: Arc<IngestionOrchestrator>,
    job_id: String,
    subject_id: String,
    staged: TempMedia,
) {
    if let Err(e) = storage
        .update_job_status(&job_id, JobStatus::Processing, None)
        .await
    {
        warn!(job_id = %job_id, error = %e, "could not mark job processing");
    }

    let (status, failure) = match orchestrator.ingest(&subject_id, staged).await {
        Ok(report) => {
            info!(
                job_id = %job_id,
                subject_id = %subject_id,
                total_sessions = report.profile.consistency.total_sessions,
                "ingestion job completed"
            );
            (JobStatus::Completed, None)
        }
        Err(e) => {
            warn!(job_id = %job_id, subject_id = %subject_id, error = %e, "ingestion job failed");
            (JobStatus::Failed, Some(e.to_string()))
        }
    };

    if let Err(e) = storage
        .update_job_status(&job_id, status, failure.as_deref())
        .await
    {
        error!(job_id = %job_id, error = %e, "could not record final job status");
    }
}
