//! What a provider/model pair accepts.
//!
//! Cloud models are looked up in static prefix tables. Ollama is asked
//! directly; anything that goes wrong there falls back to conservative local
//! defaults instead of failing the extraction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{LocalRuntime, ProviderKind};
use super::endpoint::api_root;

pub const INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Reasoning models reject a temperature parameter.
const NO_TEMPERATURE_PREFIXES: &[&str] = &["o1", "o3", "o4", "gpt-5"];

const VISION_PREFIXES: &[&str] = &[
    "gpt-4o",
    "chatgpt-4o",
    "gpt-4.1",
    "gpt-4-turbo",
    "gpt-5",
    "o1",
    "o3",
    "o4",
];

const STRUCTURED_OUTPUT_PREFIXES: &[&str] =
    &["gpt-4o", "chatgpt-4o", "gpt-4.1", "gpt-5", "o1", "o3", "o4"];

/// Early previews that predate image input and JSON schema support.
const LEGACY_REASONING: &[&str] = &["o1-mini", "o1-preview"];

/// Ollama model families that carry a vision projector.
const VISION_FAMILIES: &[&str] = &["clip", "mllama"];

const VISION_NAME_HINTS: &[&str] = &["vision", "llava", "-vl"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub supports_temperature: bool,
    pub supports_max_tokens: bool,
    pub supports_vision: bool,
    pub supports_structured_output: bool,
    pub max_temperature: f32,
}

impl ModelCapabilities {
    /// Assumed for local runtimes we cannot introspect.
    pub const LOCAL_DEFAULTS: ModelCapabilities = ModelCapabilities {
        supports_temperature: true,
        supports_max_tokens: false,
        supports_vision: false,
        supports_structured_output: true,
        max_temperature: 2.0,
    };

    pub fn cloud_chat(model: &str) -> Self {
        let model = model.trim().to_ascii_lowercase();
        let legacy = LEGACY_REASONING.iter().any(|p| model.starts_with(p));
        let has_prefix = |prefixes: &[&str]| prefixes.iter().any(|p| model.starts_with(p));

        Self {
            supports_temperature: !has_prefix(NO_TEMPERATURE_PREFIXES),
            supports_max_tokens: true,
            supports_vision: has_prefix(VISION_PREFIXES) && !legacy,
            supports_structured_output: has_prefix(STRUCTURED_OUTPUT_PREFIXES) && !legacy,
            max_temperature: 2.0,
        }
    }

    /// Local defaults, with vision guessed from the model name.
    pub fn local_fallback(model: Option<&str>) -> Self {
        Self {
            supports_vision: model.is_some_and(name_suggests_vision),
            ..Self::LOCAL_DEFAULTS
        }
    }

    pub fn cloud_search(_model: &str) -> Self {
        Self {
            supports_temperature: true,
            supports_max_tokens: true,
            supports_vision: false,
            supports_structured_output: true,
            max_temperature: 2.0,
        }
    }
}

/// True when an Ollama family list includes a vision projector.
pub fn has_vision_family(families: &[String]) -> bool {
    families
        .iter()
        .any(|f| VISION_FAMILIES.contains(&f.to_ascii_lowercase().as_str()))
}

/// True when the model name alone suggests image input.
pub fn name_suggests_vision(model: &str) -> bool {
    let lower = model.to_ascii_lowercase();
    VISION_NAME_HINTS.iter().any(|hint| lower.contains(hint))
}

#[derive(Debug, Serialize)]
struct ShowRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    details: ShowDetails,
    #[serde(default)]
    capabilities: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ShowDetails {
    #[serde(default)]
    families: Option<Vec<String>>,
}

/// Determines [`ModelCapabilities`], probing local runtimes where possible.
#[derive(Debug, Clone)]
pub struct CapabilityProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for CapabilityProber {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProber {
    pub fn new() -> Self {
        Self::with_timeout(INTROSPECTION_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Never fails: unknown or unreachable models get static defaults.
    pub async fn probe(
        &self,
        kind: ProviderKind,
        endpoint: Option<&str>,
        model: Option<&str>,
    ) -> ModelCapabilities {
        match kind {
            ProviderKind::CloudChat => ModelCapabilities::cloud_chat(model.unwrap_or_default()),
            ProviderKind::CloudSearch => ModelCapabilities::cloud_search(model.unwrap_or_default()),
            ProviderKind::LocalCompatible(LocalRuntime::LmStudio) => {
                ModelCapabilities::local_fallback(model)
            }
            ProviderKind::LocalCompatible(LocalRuntime::Ollama) => match (endpoint, model) {
                (Some(endpoint), Some(model)) => self.probe_ollama(endpoint, model).await,
                _ => ModelCapabilities::local_fallback(model),
            },
        }
    }

    async fn probe_ollama(&self, endpoint: &str, model: &str) -> ModelCapabilities {
        let url = format!("{}/api/show", api_root(endpoint));
        tracing::debug!(%url, model, "network: introspecting local model");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&ShowRequest { name: model })
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(%url, status = %r.status(), "model introspection failed, using defaults");
                return ModelCapabilities::local_fallback(Some(model));
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "model introspection failed, using defaults");
                return ModelCapabilities::local_fallback(Some(model));
            }
        };

        let show: ShowResponse = match response.json().await {
            Ok(show) => show,
            Err(e) => {
                tracing::warn!(%url, error = %e, "unreadable introspection response, using defaults");
                return ModelCapabilities::local_fallback(Some(model));
            }
        };

        let families = show.details.families.unwrap_or_default();
        let supports_vision = has_vision_family(&families)
            || show.capabilities.iter().any(|c| c == "vision")
            || name_suggests_vision(model);

        ModelCapabilities {
            supports_max_tokens: true,
            supports_vision,
            ..ModelCapabilities::LOCAL_DEFAULTS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_models_reject_temperature() {
        for model in ["o1", "o3-mini", "o4-mini", "gpt-5", "gpt-5-mini"] {
            assert!(!ModelCapabilities::cloud_chat(model).supports_temperature, "{model}");
        }
        assert!(ModelCapabilities::cloud_chat("gpt-4o-mini").supports_temperature);
    }

    #[test]
    fn test_cloud_vision_table() {
        assert!(ModelCapabilities::cloud_chat("gpt-4o").supports_vision);
        assert!(ModelCapabilities::cloud_chat("gpt-4.1-mini").supports_vision);
        assert!(!ModelCapabilities::cloud_chat("gpt-3.5-turbo").supports_vision);
        assert!(!ModelCapabilities::cloud_chat("o1-mini").supports_vision);
        assert!(!ModelCapabilities::cloud_search("sonar-pro").supports_vision);
    }

    #[test]
    fn test_structured_output_table() {
        assert!(ModelCapabilities::cloud_chat("gpt-4o-2024-08-06").supports_structured_output);
        assert!(!ModelCapabilities::cloud_chat("gpt-3.5-turbo").supports_structured_output);
    }

    #[test]
    fn test_name_hints() {
        assert!(name_suggests_vision("llava:13b"));
        assert!(name_suggests_vision("llama3.2-vision"));
        assert!(name_suggests_vision("qwen2.5-VL-7b"));
        assert!(!name_suggests_vision("llama3.1:8b"));
    }

    #[tokio::test]
    async fn test_lmstudio_uses_static_defaults() {
        let caps = CapabilityProber::new()
            .probe(
                ProviderKind::LocalCompatible(LocalRuntime::LmStudio),
                Some("http://127.0.0.1:9/v1"),
                Some("qwen2-vl"),
            )
            .await;
        assert!(caps.supports_vision);
        assert!(!caps.supports_max_tokens);
        assert!(caps.supports_structured_output);

        let caps = CapabilityProber::new()
            .probe(
                ProviderKind::LocalCompatible(LocalRuntime::LmStudio),
                None,
                Some("mistral-7b-instruct"),
            )
            .await;
        assert_eq!(caps, ModelCapabilities::LOCAL_DEFAULTS);
    }

    #[tokio::test]
    async fn test_unreachable_ollama_falls_back() {
        let caps = CapabilityProber::with_timeout(Duration::from_millis(500))
            .probe(
                ProviderKind::LocalCompatible(LocalRuntime::Ollama),
                Some("http://127.0.0.1:9"),
                Some("llama3"),
            )
            .await;
        assert_eq!(caps, ModelCapabilities::LOCAL_DEFAULTS);

        let caps = CapabilityProber::with_timeout(Duration::from_millis(500))
            .probe(
                ProviderKind::LocalCompatible(LocalRuntime::Ollama),
                Some("http://127.0.0.1:9"),
                Some("llama3.2-vision"),
            )
            .await;
        assert!(caps.supports_vision);
        assert!(!caps.supports_max_tokens);
    }

    #[test]
    fn test_vision_family_match_ignores_case() {
        assert!(has_vision_family(&["llama".to_string(), "CLIP".to_string()]));
        assert!(has_vision_family(&["Mllama".to_string()]));
        assert!(!has_vision_family(&["llama".to_string()]));
    }
}
