// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording-time probe for uploaded media.
//!
//! Reads the creation time from the `moov/mvhd` box of MP4 and QuickTime
//! containers. Anything else falls back to the file's earliest known file
//! time, then to the current time. Container times further in the future
//! than [`MAX_CLOCK_SKEW`] are treated as unset.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, warn};

use crate::media::earliest_file_time;

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01.
const QUICKTIME_EPOCH_OFFSET: i64 = 2_082_844_800;

/// How far past the current time a container tag may point.
const MAX_CLOCK_SKEW: chrono::TimeDelta = chrono::TimeDelta::days(1);

/// Largest `moov` box read into memory.
const MAX_MOOV_LEN: u64 = 64 * 1024 * 1024;

/// The single timestamp attached to every observation of one ingestion run.
pub async fn recording_time(path: &Path) -> DateTime<Utc> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || probe_creation_time(&owned)).await {
        Ok(Ok(Some(created))) => {
            debug!(path = %path.display(), %created, "found container creation time");
            return created;
        }
        Ok(Ok(None)) => debug!(path = %path.display(), "no container creation time"),
        Ok(Err(e)) => warn!(path = %path.display(), error = %e, "metadata extraction failed"),
        Err(e) => warn!(error = %e, "metadata probe task failed"),
    }

    let file_time = tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|metadata| earliest_file_time(&metadata));
    // Whole seconds, like container tags.
    match file_time {
        Some(time) => DateTime::<Utc>::from(time).trunc_subsecs(0),
        None => {
            debug!(path = %path.display(), "file time unavailable, using current time");
            Utc::now().trunc_subsecs(0)
        }
    }
}

/// Walks the top-level boxes of `path` looking for `moov/mvhd`.
pub fn probe_creation_time(path: &Path) -> io::Result<Option<DateTime<Utc>>> {
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let mut offset = 0u64;
    while offset < file_len {
        file.seek(SeekFrom::Start(offset))?;
        let Some((kind, header_len, box_len)) = read_box_header(&mut file, file_len - offset)?
        else {
            return Ok(None);
        };

        if &kind == b"moov" {
            let body_len = box_len - header_len;
            if body_len > MAX_MOOV_LEN {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "moov box too large"));
            }
            let mut body = vec![0u8; body_len as usize];
            file.read_exact(&mut body)?;
            return Ok(mvhd_creation_time(&body));
        }
        offset += box_len;
    }
    Ok(None)
}

/// Reads one box header. Returns `(type, header length, total length)`.
fn read_box_header<R: Read>(reader: &mut R, remaining: u64) -> io::Result<Option<([u8; 4], u64, u64)>> {
    if remaining < 8 {
        return Ok(None);
    }
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;
    let size = u64::from(u32::from_be_bytes([header[0], header[1], header[2], header[3]]));
    let kind = [header[4], header[5], header[6], header[7]];

    let (header_len, box_len) = match size {
        0 => (8, remaining),
        1 => {
            let mut large = [0u8; 8];
            reader.read_exact(&mut large)?;
            (16, u64::from_be_bytes(large))
        }
        n => (8, n),
    };

    if box_len < header_len || box_len > remaining {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed `{}` box", String::from_utf8_lossy(&kind)),
        ));
    }
    Ok(Some((kind, header_len, box_len)))
}

/// Finds the `mvhd` child in a `moov` body and decodes its creation time.
///
/// A zero creation time means "unset" and yields `None`, as does a time
/// beyond the current time plus [`MAX_CLOCK_SKEW`].
pub fn mvhd_creation_time(moov: &[u8]) -> Option<DateTime<Utc>> {
    let mut rest = moov;
    while rest.len() >= 8 {
        let size = u32::from_be_bytes(rest[0..4].try_into().ok()?) as usize;
        let kind = &rest[4..8];
        if size < 8 || size > rest.len() {
            return None;
        }
        if kind == b"mvhd" {
            return decode_mvhd(&rest[8..size]);
        }
        rest = &rest[size..];
    }
    None
}

fn decode_mvhd(body: &[u8]) -> Option<DateTime<Utc>> {
    let version = *body.first()?;
    let seconds = match version {
        0 => i64::from(u32::from_be_bytes(body.get(4..8)?.try_into().ok()?)),
        1 => i64::try_from(u64::from_be_bytes(body.get(4..12)?.try_into().ok()?)).ok()?,
        _ => return None,
    };
    if seconds == 0 {
        return None;
    }
    let created = DateTime::from_timestamp(seconds.checked_sub(QUICKTIME_EPOCH_OFFSET)?, 0)?;
    if created > Utc::now() + MAX_CLOCK_SKEW {
        debug!(%created, "ignoring container creation time in the future");
        return None;
    }
    Some(created)
}
