// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row conversion helpers shared by the query modules.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use persona_core::PersonaError;
use rusqlite::types::Type;

/// Fixed-width UTC timestamp; lexical order equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Rejects timestamps that would not format to four year digits.
///
/// Anything outside years 0..=9999 breaks the fixed width, and with it the
/// ordering of every query that sorts by the timestamp column.
pub fn ensure_storable(ts: &DateTime<Utc>) -> Result<(), PersonaError> {
    if (0..=9999).contains(&ts.year()) {
        Ok(())
    } else {
        Err(PersonaError::InvalidInput(format!(
            "timestamp {ts} is outside the storable range"
        )))
    }
}

/// Parse a stored timestamp column.
pub fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse an optional stored timestamp column.
pub fn parse_optional_timestamp(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_timestamp(idx, &s)).transpose()
}

/// Parse a text column through `FromStr`, reporting failures as conversion errors.
pub fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
