//! AI provider layer and AI recipe extraction.
//!
//! This module provides:
//! - [`LanguageModel`], one trait over every chat backend
//! - a [`ProviderRegistry`] that builds models from a [`ProviderConfig`]
//! - capability probing and model listing per provider
//! - the [`AiExtractionEngine`], which turns pages, transcripts and photos into recipes
//!
//! # Configuration
//!
//! `ProviderConfig::from_lookup` reads these variables:
//!
//! - `PANTRY_AI_PROVIDER`: `openai`, `perplexity`, `ollama` or `lmstudio`
//! - `PANTRY_AI_MODEL` / `PANTRY_AI_VISION_MODEL`: model names
//! - `PANTRY_AI_ENDPOINT`: base URL (required for local runtimes)
//! - `PANTRY_AI_API_KEY`: falls back to `OPENAI_API_KEY` or `PERPLEXITY_API_KEY`
//! - `PANTRY_AI_TEMPERATURE`, `PANTRY_AI_MAX_TOKENS`, `PANTRY_AI_TIMEOUT_SECS`
//! - `PANTRY_AI_CACHE_DIR`: enables the response cache (`default` for ~/.pantry/ai-cache)
//!
//! # Example
//!
//! ```ignore
//! use pantry_core::ai::{AiExtractionEngine, AiExtractor, AiSettings, ProviderConfig, ProviderKind};
//!
//! let provider = ProviderConfig::new(ProviderKind::CloudChat, "gpt-4o-mini").with_api_key(key);
//! let engine = AiExtractionEngine::default();
//! let result = engine
//!     .extract_page(&AiSettings::enabled(provider), url, &page_text, &[])
//!     .await?;
//! println!("{} ({} tokens)", result.value.name, result.usage.total_tokens);
//! ```

pub mod cache;
pub mod capabilities;
pub mod classify;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod fake;
pub mod model;
pub mod models;
pub mod openai;
pub mod prompts;
pub mod registry;
pub mod schema;

pub use cache::{CacheStats, CachingModel};
pub use capabilities::{CapabilityProber, ModelCapabilities};
pub use classify::classify_provider_error;
pub use config::{GenerationSettings, LocalRuntime, ProviderConfig, ProviderKind};
pub use endpoint::normalize_endpoint;
pub use engine::{AiExtractionEngine, AiExtractor, AiSettings};
pub use error::{AiErrorKind, AiFailure, AiResult, AiSuccess};
pub use fake::FakeModel;
pub use model::{
    ChatMessage, GenerationRequest, GenerationResponse, LanguageModel, ProviderError,
    ResponseFormat, ResponseSchema, Role, Usage,
};
pub use models::{AvailableModel, ModelLister};
pub use openai::ChatCompletionsModel;
pub use registry::{
    all_providers, provider_info, resolve_provider, ModelFactory, ModelResolver, ProviderInfo,
    ProviderModels, ProviderRegistry, StaticResolver,
};
