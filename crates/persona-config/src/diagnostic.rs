// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reports for `persona.toml` problems.
//!
//! Figment extraction failures become miette diagnostics that point at the
//! offending line when the value came from a TOML file or inline text.
//! Unknown keys name the closest accepted key of their section.

#![allow(unused_assignments)] // emitted by the miette derive

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

const INLINE_SOURCE_NAME: &str = "persona.toml (inline)";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {table}")]
    #[diagnostic(code(persona::config::unknown_key), help("{help}"))]
    UnknownKey {
        key: String,
        /// `[section]`, or `the top level`.
        table: String,
        suggestion: Option<String>,
        help: String,
        #[label("not a persona setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(persona::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// Parsed, but rejected by [`crate::validation::validate_config`].
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(persona::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(persona::config::other))]
    Other(String),
}

/// Converts every error held by `err`.
///
/// `inline` is the TOML text for configs loaded from a string; file-backed
/// values are located by reading the file named in the error's metadata.
pub fn from_figment(err: figment::Error, inline: Option<&str>) -> Vec<ConfigError> {
    err.into_iter().map(|error| convert(&error, inline)).collect()
}

fn convert(error: &FigmentError, inline: Option<&str>) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(key, accepted) => {
            let table = error.path.join(".");
            let suggestion = suggest_key(key, accepted);
            let (span, src) = locate(error, inline, &table, key);
            ConfigError::UnknownKey {
                key: key.clone(),
                help: unknown_key_help(&table, suggestion.as_deref(), accepted),
                table: table_label(&table),
                suggestion,
                span,
                src,
            }
        }
        Kind::InvalidType(found, expected) => {
            let (table, key) = match error.path.split_last() {
                Some((key, table)) => (table.join("."), key.clone()),
                None => (String::new(), String::new()),
            };
            let (span, src) = locate(error, inline, &table, &key);
            ConfigError::InvalidType {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn table_label(table: &str) -> String {
    if table.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{table}]")
    }
}

fn unknown_key_help(table: &str, suggestion: Option<&str>, accepted: &[&str]) -> String {
    let listing = if table.is_empty() {
        format!("sections are: {}", accepted.join(", "))
    } else {
        format!("[{table}] accepts: {}", accepted.join(", "))
    };
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {listing}"),
        None => listing,
    }
}

fn locate(
    error: &FigmentError,
    inline: Option<&str>,
    table: &str,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((name, text)) = source_text(error, inline) else {
        return (None, None);
    };
    match locate_key(&text, table, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(name, text)),
        ),
        None => (None, None),
    }
}

/// The TOML text the failing value came from, with its display name.
fn source_text(error: &FigmentError, inline: Option<&str>) -> Option<(String, String)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.clone()),
            _ => None,
        });
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .ok()
            .map(|text| (path.display().to_string(), text)),
        None => inline.map(|text| (INLINE_SOURCE_NAME.to_string(), text.to_string())),
    }
}

/// Byte offset of the `key = ...` line inside the `[table]` section.
///
/// `table` is the dotted section path; empty means before any header.
pub fn locate_key(text: &str, table: &str, key: &str) -> Option<usize> {
    let mut current = String::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header.split(']').next().unwrap_or_default().trim().to_string();
        } else if current == table && assigns(trimmed, key) {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    None
}

fn assigns(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// The accepted key closest to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, accepted: &[&str]) -> Option<String> {
    accepted
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    eprintln!(
        "persona.toml has {} problem{}:",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("  {error}"),
        }
    }
}
