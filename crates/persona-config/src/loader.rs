// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./persona.toml` > `~/.config/persona/persona.toml` > `/etc/persona/persona.toml`
//! with environment variable overrides via `PERSONA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PersonaConfig;

/// Config sections addressable through `PERSONA_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "agent",
    "anthropic",
    "transcription",
    "storage",
    "gateway",
    "ingestion",
    "response",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/persona/persona.toml` (system-wide)
/// 3. `~/.config/persona/persona.toml` (user XDG config)
/// 4. `./persona.toml` (local directory)
/// 5. `PERSONA_*` environment variables
pub fn load_config() -> Result<PersonaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PersonaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PersonaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PersonaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PersonaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PersonaConfig::default()))
        .merge(Toml::file("/etc/persona/persona.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("persona/persona.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("persona.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that underscore-containing
/// key names survive: `PERSONA_RESPONSE_REPLY_MAX_TOKENS` must map to
/// `response.reply_max_tokens`, not `response.reply.max.tokens`.
fn env_provider() -> Env {
    Env::prefixed("PERSONA_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to its dotted config path.
fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}
