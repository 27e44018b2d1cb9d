// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Persona service.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use persona_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Listening on port {}", config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::PersonaConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors are converted to diagnostics with typo suggestions; a
/// config that deserializes is then checked by [`validation::validate_config`].
pub fn load_and_validate() -> Result<PersonaConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::from_figment(err, None)),
    }
}

/// Load configuration from an explicit file and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<PersonaConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::from_figment(err, None)),
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<PersonaConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::from_figment(err, Some(toml_content))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typo_produces_unknown_key_with_suggestion() {
        let errors = load_and_validate_str("[gateway]\nprot = 8080\n").unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. } if key == "prot" && s == "port"
        )));
    }

    #[test]
    fn wrong_type_produces_invalid_type() {
        let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ConfigError::InvalidType { .. }))
        );
    }

    #[test]
    fn semantic_failure_surfaces_as_validation() {
        let errors =
            load_and_validate_str("[ingestion]\nconfidence_increment = 2.0\n").unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ConfigError::Validation { .. }))
        );
    }

    #[test]
    fn valid_inline_config_loads() {
        let config = load_and_validate_str(
            "[agent]\nname = \"mirror\"\n\n[response]\nmock_token_delay_ms = 0\n",
        )
        .unwrap();
        assert_eq!(config.agent.name, "mirror");
        assert_eq!(config.response.mock_token_delay_ms, 0);
    }

    #[test]
    fn file_errors_carry_suggestions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.toml");
        std::fs::write(&path, "[ingestion]\nconfidence_incremnt = 0.2\n").unwrap();
        let errors = load_and_validate_path(&path).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { table, suggestion: Some(s), .. }
                if table == "[ingestion]" && s == "confidence_increment"
        )));
    }

    #[test]
    fn explicit_path_loads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.toml");
        std::fs::write(&path, "[storage]\ndatabase_path = \"/tmp/x.db\"\n").unwrap();
        let config = load_and_validate_path(&path).unwrap();
        assert_eq!(config.storage.database_path, "/tmp/x.db");
    }
}
