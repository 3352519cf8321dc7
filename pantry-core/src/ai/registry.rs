//! Builds model handles from a [`ProviderConfig`].
//!
//! Each [`ProviderKind`] variant has its own [`ModelFactory`]; the registry
//! only picks the factory and wires the optional response cache around the
//! handles it returns. Nothing here touches the network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::cache::CachingModel;
use super::capabilities::{CapabilityProber, ModelCapabilities};
use super::config::{LocalRuntime, ProviderConfig, ProviderKind};
use super::endpoint::normalize_endpoint;
use super::error::{AiErrorKind, AiFailure};
use super::model::LanguageModel;
use super::openai::ChatCompletionsModel;

/// Static description of a provider family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub requires_api_key: bool,
    pub requires_endpoint: bool,
    pub default_endpoint: Option<&'static str>,
    pub supports_live_introspection: bool,
}

/// Builds handles for one provider family.
pub trait ModelFactory: Send + Sync {
    fn info(&self) -> ProviderInfo;

    /// Build a handle for `model`. Fails only on missing configuration.
    fn build(
        &self,
        config: &ProviderConfig,
        model: &str,
    ) -> Result<Arc<dyn LanguageModel>, AiFailure>;
}

fn configuration_error(message: impl Into<String>) -> AiFailure {
    AiFailure::new(AiErrorKind::ConfigurationError, message)
}

fn required_api_key(config: &ProviderConfig, info: &ProviderInfo) -> Result<String, AiFailure> {
    config.api_key().map(str::to_string).ok_or_else(|| {
        configuration_error(format!("{} requires an API key", info.display_name))
    })
}

fn required_endpoint(config: &ProviderConfig, info: &ProviderInfo) -> Result<String, AiFailure> {
    config
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| normalize_endpoint(e, true))
        .ok_or_else(|| configuration_error(format!("{} requires an endpoint URL", info.display_name)))
}

fn cloud_endpoint(config: &ProviderConfig, default: &str) -> String {
    let endpoint = config
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(default);
    normalize_endpoint(endpoint, false)
}

fn chat_model(
    info: &ProviderInfo,
    endpoint: &str,
    model: &str,
    api_key: Option<String>,
    config: &ProviderConfig,
) -> Result<ChatCompletionsModel, AiFailure> {
    ChatCompletionsModel::new(info.name, endpoint, model, api_key, config.request_timeout())
        .map_err(|e| configuration_error(format!("could not build HTTP client: {}", e)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CloudChatFactory;

impl ModelFactory for CloudChatFactory {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "openai",
            display_name: "OpenAI",
            requires_api_key: true,
            requires_endpoint: false,
            default_endpoint: ProviderKind::CloudChat.default_endpoint(),
            supports_live_introspection: false,
        }
    }

    fn build(
        &self,
        config: &ProviderConfig,
        model: &str,
    ) -> Result<Arc<dyn LanguageModel>, AiFailure> {
        let info = self.info();
        let api_key = required_api_key(config, &info)?;
        let endpoint = cloud_endpoint(config, info.default_endpoint.unwrap_or_default());
        let model = chat_model(&info, &endpoint, model, Some(api_key), config)?
            .with_max_completion_tokens(true);
        Ok(Arc::new(model))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CloudSearchFactory;

impl ModelFactory for CloudSearchFactory {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "perplexity",
            display_name: "Perplexity",
            requires_api_key: true,
            requires_endpoint: false,
            default_endpoint: ProviderKind::CloudSearch.default_endpoint(),
            supports_live_introspection: false,
        }
    }

    fn build(
        &self,
        config: &ProviderConfig,
        model: &str,
    ) -> Result<Arc<dyn LanguageModel>, AiFailure> {
        let info = self.info();
        let api_key = required_api_key(config, &info)?;
        let endpoint = cloud_endpoint(config, info.default_endpoint.unwrap_or_default());
        Ok(Arc::new(chat_model(&info, &endpoint, model, Some(api_key), config)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OllamaFactory;

impl ModelFactory for OllamaFactory {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "ollama",
            display_name: "Ollama",
            requires_api_key: false,
            requires_endpoint: true,
            default_endpoint: None,
            supports_live_introspection: true,
        }
    }

    fn build(
        &self,
        config: &ProviderConfig,
        model: &str,
    ) -> Result<Arc<dyn LanguageModel>, AiFailure> {
        let info = self.info();
        let endpoint = required_endpoint(config, &info)?;
        let api_key = config.api_key().map(str::to_string);
        Ok(Arc::new(chat_model(&info, &endpoint, model, api_key, config)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LmStudioFactory;

impl ModelFactory for LmStudioFactory {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "lmstudio",
            display_name: "LM Studio",
            requires_api_key: false,
            requires_endpoint: true,
            default_endpoint: None,
            supports_live_introspection: false,
        }
    }

    fn build(
        &self,
        config: &ProviderConfig,
        model: &str,
    ) -> Result<Arc<dyn LanguageModel>, AiFailure> {
        let info = self.info();
        let endpoint = required_endpoint(config, &info)?;
        let api_key = config.api_key().map(str::to_string);
        Ok(Arc::new(chat_model(&info, &endpoint, model, api_key, config)?))
    }
}

pub fn factory_for(kind: ProviderKind) -> &'static dyn ModelFactory {
    match kind {
        ProviderKind::CloudChat => &CloudChatFactory,
        ProviderKind::CloudSearch => &CloudSearchFactory,
        ProviderKind::LocalCompatible(LocalRuntime::Ollama) => &OllamaFactory,
        ProviderKind::LocalCompatible(LocalRuntime::LmStudio) => &LmStudioFactory,
    }
}

pub fn provider_info(kind: ProviderKind) -> ProviderInfo {
    factory_for(kind).info()
}

pub fn all_providers() -> Vec<ProviderInfo> {
    ProviderKind::ALL.iter().map(|k| provider_info(*k)).collect()
}

/// Text and vision handles for one configuration.
#[derive(Debug, Clone)]
pub struct ProviderModels {
    pub model: Arc<dyn LanguageModel>,
    pub vision_model: Arc<dyn LanguageModel>,
    pub provider_name: &'static str,
}

/// Build the handles for `config`.
pub fn resolve_provider(config: &ProviderConfig) -> Result<ProviderModels, AiFailure> {
    let text_model = config.model.trim();
    if text_model.is_empty() {
        return Err(configuration_error("no model configured"));
    }

    let factory = factory_for(config.kind);
    let wrap = |model: Arc<dyn LanguageModel>| -> Arc<dyn LanguageModel> {
        match &config.cache_dir {
            Some(dir) => Arc::new(CachingModel::new(model, dir.clone())),
            None => model,
        }
    };

    let model = wrap(factory.build(config, text_model)?);
    let vision_name = config.vision_model_name().trim();
    let vision_model = if vision_name == text_model {
        model.clone()
    } else {
        wrap(factory.build(config, vision_name)?)
    };

    Ok(ProviderModels {
        model,
        vision_model,
        provider_name: factory.info().name,
    })
}

/// Seam between the engine and provider construction.
#[async_trait]
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, config: &ProviderConfig) -> Result<ProviderModels, AiFailure>;

    async fn capabilities(&self, config: &ProviderConfig, model: &str) -> ModelCapabilities;
}

/// The production resolver: factories plus live capability probing.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    prober: CapabilityProber,
}

impl ProviderRegistry {
    pub fn new(prober: CapabilityProber) -> Self {
        Self { prober }
    }
}

#[async_trait]
impl ModelResolver for ProviderRegistry {
    fn resolve(&self, config: &ProviderConfig) -> Result<ProviderModels, AiFailure> {
        resolve_provider(config)
    }

    async fn capabilities(&self, config: &ProviderConfig, model: &str) -> ModelCapabilities {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| normalize_endpoint(e, config.kind.is_local()));
        self.prober
            .probe(config.kind, endpoint.as_deref(), Some(model))
            .await
    }
}

/// Hands out prebuilt models; for tests and embedders with their own clients.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    model: Arc<dyn LanguageModel>,
    vision_model: Arc<dyn LanguageModel>,
    capabilities: ModelCapabilities,
}

impl StaticResolver {
    pub fn new(model: Arc<dyn LanguageModel>, capabilities: ModelCapabilities) -> Self {
        Self {
            vision_model: model.clone(),
            model,
            capabilities,
        }
    }

    pub fn with_vision_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.vision_model = model;
        self
    }
}

#[async_trait]
impl ModelResolver for StaticResolver {
    fn resolve(&self, _config: &ProviderConfig) -> Result<ProviderModels, AiFailure> {
        Ok(ProviderModels {
            model: self.model.clone(),
            vision_model: self.vision_model.clone(),
            provider_name: self.model.provider_name(),
        })
    }

    async fn capabilities(&self, _config: &ProviderConfig, _model: &str) -> ModelCapabilities {
        self.capabilities
    }
}
