//! Per-call extraction configuration.
//!
//! The core never reads process state on its own: callers build an
//! [`ExtractionConfig`] (by hand, from JSON, or with [`ExtractionConfig::from_env`])
//! and pass it to every extraction.

use serde::{Deserialize, Serialize};

use crate::ai::config::ProviderConfig;
use crate::ai::engine::AiSettings;
use crate::classify::{
    default_content_indicators, default_schema_indicators, default_video_url_patterns,
};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub video_parsing_enabled: bool,
    /// Skip structured extractors and go straight to AI.
    #[serde(default)]
    pub always_use_ai: bool,
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    #[serde(default = "default_schema_indicators")]
    pub schema_indicators: Vec<String>,
    #[serde(default = "default_content_indicators")]
    pub content_indicators: Vec<String>,
    /// Regexes matched against source URLs.
    #[serde(default = "default_video_url_patterns")]
    pub video_url_patterns: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ai_enabled: false,
            video_parsing_enabled: false,
            always_use_ai: false,
            provider: None,
            schema_indicators: default_schema_indicators(),
            content_indicators: default_content_indicators(),
            video_url_patterns: default_video_url_patterns(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl ExtractionConfig {
    /// AI enabled against `provider`, everything else default.
    pub fn with_ai(provider: ProviderConfig) -> Self {
        Self {
            ai_enabled: true,
            provider: Some(provider),
            ..Self::default()
        }
    }

    pub fn ai_settings(&self) -> AiSettings {
        AiSettings {
            enabled: self.ai_enabled,
            provider: self.provider.clone(),
        }
    }

    /// Load from `PANTRY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| -> Result<bool, ConfigError> {
            match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                Some(value) => parse_bool(key, &value),
                None => Ok(false),
            }
        };

        Ok(Self {
            ai_enabled: flag("PANTRY_AI_ENABLED")?,
            video_parsing_enabled: flag("PANTRY_VIDEO_PARSING_ENABLED")?,
            always_use_ai: flag("PANTRY_ALWAYS_USE_AI")?,
            provider: ProviderConfig::from_lookup(&lookup)?,
            ..Self::default()
        })
    }
}
