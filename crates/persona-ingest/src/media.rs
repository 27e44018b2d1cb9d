// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped ownership of media handed to the pipeline.
//!
//! The pipeline only ever deletes files it created itself: callers name a
//! source file, [`stage_copy`] copies it into a private temp file, and the
//! returned [`TempMedia`] removes that copy when dropped.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use persona_core::PersonaError;
use tracing::{debug, warn};

/// Copies `source` into a fresh temp file with the same extension.
///
/// The copy keeps the source's earliest known file time as its
/// modification time, so the recording-time fallback sees the original.
/// The source itself is never modified.
pub async fn stage_copy(source: &Path) -> Result<TempMedia, PersonaError> {
    let metadata = match tokio::fs::metadata(source).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            return Err(PersonaError::InvalidInput(format!(
                "media file not found: {}",
                source.display()
            )));
        }
    };

    let suffix = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let (_, path) = tempfile::Builder::new()
        .prefix("persona-ingest-")
        .suffix(&suffix)
        .tempfile()
        .and_then(|file| file.keep().map_err(|e| e.error))
        .map_err(|e| PersonaError::Internal(format!("cannot create working copy: {e}")))?;
    // Owned from here on, so every early return below removes it.
    let media = TempMedia::new(path);

    tokio::fs::copy(source, media.path())
        .await
        .map_err(|e| PersonaError::Internal(format!("cannot copy {}: {e}", source.display())))?;

    if let Some(time) = earliest_file_time(&metadata) {
        let copy = media.path().to_path_buf();
        let stamped = tokio::task::spawn_blocking(move || {
            std::fs::File::options()
                .write(true)
                .open(&copy)
                .and_then(|file| file.set_modified(time))
        })
        .await;
        match stamped {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "could not carry file time to working copy"),
            Err(e) => warn!(error = %e, "file time task aborted"),
        }
    }

    debug!(source = %source.display(), copy = %media.path().display(), "staged working copy");
    Ok(media)
}

/// Earlier of creation and modification time, whichever are available.
pub(crate) fn earliest_file_time(metadata: &std::fs::Metadata) -> Option<SystemTime> {
    match (metadata.created().ok(), metadata.modified().ok()) {
        (Some(created), Some(modified)) => Some(created.min(modified)),
        (created, modified) => created.or(modified),
    }
}

/// A pipeline-owned media file, deleted when dropped.
///
/// Only wrap files the pipeline created. Deletion is best-effort: a
/// failure is logged and never escalated.
#[derive(Debug)]
pub struct TempMedia {
    path: PathBuf,
}

impl TempMedia {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary media"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "could not delete temporary media"
            ),
        }
    }
}
