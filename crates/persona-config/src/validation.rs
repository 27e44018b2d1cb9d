// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::PersonaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first one.
pub fn validate_config(config: &PersonaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.gateway.port == 0 {
        fail("gateway.port must be non-zero".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let inc = config.ingestion.confidence_increment;
    if !(inc > 0.0 && inc <= 1.0) {
        fail(format!(
            "ingestion.confidence_increment must be in (0, 1], got {inc}"
        ));
    }

    if config.anthropic.max_tokens == 0 {
        fail("anthropic.max_tokens must be greater than zero".to_string());
    }
    if config.response.reply_max_tokens == 0 {
        fail("response.reply_max_tokens must be greater than zero".to_string());
    }
    if config.response.rewrite_max_tokens == 0 {
        fail("response.rewrite_max_tokens must be greater than zero".to_string());
    }

    if config.transcription.endpoint.trim().is_empty() {
        fail("transcription.endpoint must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
