//! Disk cache in front of a language model.
//!
//! Responses are keyed by provider, model and a hash of the full serialized
//! request, so a change to the prompt, images, schema or settings misses.
//! Blank responses are never written, and a hit reports zero token usage
//! since no provider was billed for it.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::model::{GenerationRequest, GenerationResponse, LanguageModel, ProviderError, Usage};

/// Cached response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub provider: String,
    pub model: String,
    pub request_hash: String,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    metadata: CacheMetadata,
    response: GenerationResponse,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_responses: usize,
}

/// A caching wrapper around any language model.
#[derive(Debug)]
pub struct CachingModel {
    inner: Arc<dyn LanguageModel>,
    cache_dir: PathBuf,
}

impl CachingModel {
    pub fn new(inner: Arc<dyn LanguageModel>, cache_dir: PathBuf) -> Self {
        Self { inner, cache_dir }
    }

    /// SHA-256 of the serialized request, first 16 bytes as hex.
    fn cache_key(request: &GenerationRequest) -> Result<String, ProviderError> {
        let serialized =
            serde_json::to_vec(request).map_err(|e| ProviderError::Cache(e.to_string()))?;
        let digest = Sha256::digest(&serialized);
        Ok(hex::encode(&digest[..16]))
    }

    fn model_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .join(self.inner.provider_name())
            .join(self.inner.model_name().replace(['/', ':', '\\'], "_"))
    }

    fn cache_path(&self, hash: &str) -> PathBuf {
        self.model_cache_dir().join(format!("{}.json", hash))
    }

    fn get_cached(&self, hash: &str) -> Option<GenerationResponse> {
        let content = fs::read_to_string(self.cache_path(hash)).ok()?;
        let cached: CachedResponse = serde_json::from_str(&content).ok()?;
        tracing::debug!(
            provider = self.inner.provider_name(),
            model = self.inner.model_name(),
            request_hash = hash,
            "model cache hit"
        );
        Some(cached.response)
    }

    fn save_to_cache(&self, hash: &str, response: &GenerationResponse) -> Result<(), ProviderError> {
        fs::create_dir_all(self.model_cache_dir()).map_err(|e| ProviderError::Cache(e.to_string()))?;

        let cached = CachedResponse {
            metadata: CacheMetadata {
                provider: self.inner.provider_name().to_string(),
                model: self.inner.model_name().to_string(),
                request_hash: hash.to_string(),
                cached_at: Utc::now(),
            },
            response: response.clone(),
        };
        let content =
            serde_json::to_string_pretty(&cached).map_err(|e| ProviderError::Cache(e.to_string()))?;
        fs::write(self.cache_path(hash), content).map_err(|e| ProviderError::Cache(e.to_string()))
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cached_responses = fs::read_dir(self.model_cache_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0);
        CacheStats { cached_responses }
    }
}

#[async_trait]
impl LanguageModel for CachingModel {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let hash = Self::cache_key(&request)?;

        if let Some(cached) = self.get_cached(&hash) {
            return Ok(GenerationResponse {
                usage: Usage::default(),
                ..cached
            });
        }

        tracing::debug!(
            provider = self.inner.provider_name(),
            model = self.inner.model_name(),
            request_hash = %hash,
            "model cache miss, calling provider"
        );
        let response = self.inner.generate(request).await?;

        if response.content.trim().is_empty() {
            tracing::debug!(request_hash = %hash, "blank model response, not caching");
        } else if let Err(e) = self.save_to_cache(&hash, &response) {
            tracing::warn!(error = %e, "failed to cache model response");
        }

        Ok(response)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
