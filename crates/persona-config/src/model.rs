// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Persona workspace.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Persona configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Anthropic API settings (the LLM capability).
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Speech-to-text backend for the audio extraction stage.
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Profile store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Ingestion pipeline settings.
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Reply generation settings.
    #[serde(default)]
    pub response: ResponseConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "persona".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` falls back to `ANTHROPIC_API_KEY`; if that
    /// is unset too, the service runs in mock mode.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for every LLM request.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Token budget for style synthesis requests.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Speech-to-text configuration for the audio stage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptionConfig {
    /// API key for an OpenAI-compatible transcription endpoint. `None` falls
    /// back to `OPENAI_API_KEY`; if that is unset too, fixture transcripts are used.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Full URL of the transcription endpoint.
    #[serde(default = "default_transcription_endpoint")]
    pub endpoint: String,

    /// Transcription model identifier.
    #[serde(default = "default_transcription_model")]
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_transcription_endpoint(),
            model: default_transcription_model(),
        }
    }
}

fn default_transcription_endpoint() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("persona").join("persona.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("persona.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestionConfig {
    /// Confidence added to a profile per completed ingestion (capped at 1.0).
    #[serde(default = "default_confidence_increment")]
    pub confidence_increment: f64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            confidence_increment: default_confidence_increment(),
        }
    }
}

fn default_confidence_increment() -> f64 {
    0.1
}

/// Reply generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseConfig {
    /// Token budget for single-shot replies.
    #[serde(default = "default_reply_max_tokens")]
    pub reply_max_tokens: u32,

    /// Token budget for guided rewrites.
    #[serde(default = "default_rewrite_max_tokens")]
    pub rewrite_max_tokens: u32,

    /// Delay between words of the mock guided stream, in milliseconds.
    #[serde(default = "default_mock_token_delay_ms")]
    pub mock_token_delay_ms: u64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            reply_max_tokens: default_reply_max_tokens(),
            rewrite_max_tokens: default_rewrite_max_tokens(),
            mock_token_delay_ms: default_mock_token_delay_ms(),
        }
    }
}

fn default_reply_max_tokens() -> u32 {
    150
}

fn default_rewrite_max_tokens() -> u32 {
    300
}

fn default_mock_token_delay_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: PersonaConfig = toml::from_str("").unwrap();
        assert_eq!(config.agent.name, "persona");
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.ingestion.confidence_increment, 0.1);
        assert_eq!(config.response.reply_max_tokens, 150);
        assert_eq!(config.response.rewrite_max_tokens, 300);
        assert_eq!(config.response.mock_token_delay_ms, 100);
        assert_eq!(config.transcription.model, "whisper-1");
        assert!(config.anthropic.api_key.is_none());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let toml_str = r#"
[anthropic]
api_key = "sk-test"
"#;
        let config: PersonaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.anthropic.api_version, "2023-06-01");
    }

    #[test]
    fn unknown_section_key_is_rejected() {
        let toml_str = r#"
[gateway]
prot = 8080
"#;
        assert!(toml::from_str::<PersonaConfig>(toml_str).is_err());
    }

    #[test]
    fn unknown_top_level_section_is_rejected() {
        assert!(toml::from_str::<PersonaConfig>("[telegram]\nbot_token = \"x\"\n").is_err());
    }
}
