//! Provider configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

/// Local runtimes exposing an OpenAI-compatible API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalRuntime {
    Ollama,
    LmStudio,
}

/// Closed set of provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderKind {
    /// OpenAI chat completions.
    CloudChat,
    /// Perplexity (search-augmented chat).
    CloudSearch,
    LocalCompatible(LocalRuntime),
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::CloudChat,
        ProviderKind::CloudSearch,
        ProviderKind::LocalCompatible(LocalRuntime::Ollama),
        ProviderKind::LocalCompatible(LocalRuntime::LmStudio),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::CloudChat => "openai",
            ProviderKind::CloudSearch => "perplexity",
            ProviderKind::LocalCompatible(LocalRuntime::Ollama) => "ollama",
            ProviderKind::LocalCompatible(LocalRuntime::LmStudio) => "lmstudio",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::LocalCompatible(_))
    }

    /// Vendor URL used when no endpoint is configured. Local runtimes have none.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            ProviderKind::CloudChat => Some(OPENAI_BASE_URL),
            ProviderKind::CloudSearch => Some(PERPLEXITY_BASE_URL),
            ProviderKind::LocalCompatible(_) => None,
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::CloudChat => Some("gpt-4o-mini"),
            ProviderKind::CloudSearch => Some("sonar"),
            ProviderKind::LocalCompatible(_) => None,
        }
    }

    /// Vendor-specific variable consulted when no API key is configured.
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::CloudChat => Some("OPENAI_API_KEY"),
            ProviderKind::CloudSearch => Some("PERPLEXITY_API_KEY"),
            ProviderKind::LocalCompatible(_) => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::CloudChat),
            "perplexity" => Ok(ProviderKind::CloudSearch),
            "ollama" => Ok(ProviderKind::LocalCompatible(LocalRuntime::Ollama)),
            "lmstudio" | "lm-studio" | "lm_studio" => {
                Ok(ProviderKind::LocalCompatible(LocalRuntime::LmStudio))
            }
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Sampling settings requested by the operator. The engine adjusts them to
/// what the model accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

/// Everything needed to reach one provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    /// Model used for image input; the text model when unset.
    #[serde(default)]
    pub vision_model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Enables the on-disk response cache.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("generation", &self.generation)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            vision_model: None,
            endpoint: None,
            api_key: None,
            generation: GenerationSettings::default(),
            request_timeout_secs: None,
            cache_dir: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn vision_model_name(&self) -> &str {
        self.vision_model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.model)
    }

    /// The configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Build a provider configuration from `PANTRY_AI_*` variables.
    ///
    /// Returns `Ok(None)` when `PANTRY_AI_PROVIDER` is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(kind) = get("PANTRY_AI_PROVIDER") else {
            return Ok(None);
        };
        let kind: ProviderKind = kind.parse()?;

        let model = get("PANTRY_AI_MODEL")
            .or_else(|| kind.default_model().map(str::to_string))
            .ok_or_else(|| ConfigError::Missing("PANTRY_AI_MODEL".to_string()))?;

        let api_key = get("PANTRY_AI_API_KEY").or_else(|| kind.api_key_env_var().and_then(get));

        let generation = GenerationSettings {
            temperature: parse_temperature(&get)?,
            max_output_tokens: parse_opt(&get, "PANTRY_AI_MAX_TOKENS")?,
        };

        let cache_dir = get("PANTRY_AI_CACHE_DIR").map(|dir| {
            if dir == "default" {
                default_cache_dir()
            } else {
                PathBuf::from(dir)
            }
        });

        Ok(Some(Self {
            kind,
            model,
            vision_model: get("PANTRY_AI_VISION_MODEL"),
            endpoint: get("PANTRY_AI_ENDPOINT"),
            api_key,
            generation,
            request_timeout_secs: parse_opt(&get, "PANTRY_AI_TIMEOUT_SECS")?,
            cache_dir,
        }))
    }
}

pub(crate) fn parse_opt<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}

fn parse_temperature<G>(get: &G) -> Result<Option<f32>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    const KEY: &str = "PANTRY_AI_TEMPERATURE";
    match parse_opt::<f32, G>(get, KEY)? {
        Some(t) if !t.is_finite() || t < 0.0 => Err(ConfigError::InvalidValue {
            key: KEY.to_string(),
            value: t.to_string(),
        }),
        t => Ok(t),
    }
}

/// Get the default cache directory: ~/.pantry/ai-cache
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".pantry").join("ai-cache"))
        .unwrap_or_else(|| PathBuf::from("data/ai-cache"))
}
