//! Extraction orchestration: the fallback policy callers invoke.
//!
//! URL sources are classified (video or web page), fetched, checked for
//! recipe-likeness and run through the structured extractors, falling back to
//! AI when allowed. Image sources go straight to AI. Every strategy tried is
//! recorded as an [`ExtractionAttempt`].

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::ai::engine::{AiExtractionEngine, AiExtractor};
use crate::ai::error::{AiErrorKind, AiFailure};
use crate::ai::model::Usage;
use crate::classify::{is_video_url, looks_like_recipe};
use crate::config::ExtractionConfig;
use crate::error::VideoError;
use crate::extract::{default_extractors, html::page_text, StructuredExtractor};
use crate::fetch::ContentFetcher;
use crate::normalize::RecipeNormalizer;
use crate::types::{ExtractionAttempt, ExtractionMethod, ImageInput, NormalizedRecipe};
use crate::video::VideoProcessor;

/// Where a recipe comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipeSource {
    Url(String),
    Images(Vec<ImageInput>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub source: RecipeSource,
    /// Allergens to tag; empty disables tag detection.
    pub allergies: Vec<String>,
    /// Skip structured extractors for this request.
    pub force_ai: bool,
}

impl ExtractionRequest {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source: RecipeSource::Url(url.into()),
            allergies: Vec::new(),
            force_ai: false,
        }
    }

    pub fn images(images: Vec<ImageInput>) -> Self {
        Self {
            source: RecipeSource::Images(images),
            allergies: Vec::new(),
            force_ai: false,
        }
    }

    pub fn with_allergies(mut self, allergies: Vec<String>) -> Self {
        self.allergies = allergies;
        self
    }

    pub fn with_force_ai(mut self, force_ai: bool) -> Self {
        self.force_ai = force_ai;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSuccess {
    pub recipe: NormalizedRecipe,
    pub used_ai: bool,
    pub method: ExtractionMethod,
    pub usage: Usage,
    pub attempts: Vec<ExtractionAttempt>,
}

#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("video parsing disabled")]
    VideoParsingDisabled,

    #[error("video processing failed: {0}")]
    VideoProcessing(#[from] VideoError),

    #[error("cannot fetch {url}: {reason}")]
    CannotFetch { url: String, reason: String },

    #[error("not a recipe page")]
    NotARecipePage,

    #[error("cannot parse recipe")]
    CannotParseRecipe { attempts: Vec<ExtractionAttempt> },

    #[error(transparent)]
    Ai(#[from] AiFailure),
}

impl ExtractionFailure {
    /// Strategies tried before giving up; empty for failures that precede extraction.
    pub fn attempts(&self) -> &[ExtractionAttempt] {
        match self {
            ExtractionFailure::CannotParseRecipe { attempts } => attempts,
            _ => &[],
        }
    }
}

/// Runs the extraction policy. Holds no per-request state, so one instance
/// can serve concurrent requests.
pub struct ExtractionOrchestrator {
    fetcher: Arc<dyn ContentFetcher>,
    extractors: Vec<Box<dyn StructuredExtractor>>,
    ai: Arc<dyn AiExtractor>,
    video: Arc<dyn VideoProcessor>,
    normalizer: RecipeNormalizer,
}

impl std::fmt::Debug for ExtractionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOrchestrator")
            .field(
                "extractors",
                &self.extractors.iter().map(|e| e.method()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl ExtractionOrchestrator {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        ai: Arc<dyn AiExtractor>,
        video: Arc<dyn VideoProcessor>,
    ) -> Self {
        Self {
            fetcher,
            extractors: default_extractors(),
            ai,
            video,
            normalizer: RecipeNormalizer::default(),
        }
    }

    /// Default AI engine and normalizer around the given collaborators.
    pub fn with_defaults(fetcher: Arc<dyn ContentFetcher>, video: Arc<dyn VideoProcessor>) -> Self {
        Self::new(fetcher, Arc::new(AiExtractionEngine::default()), video)
    }

    pub fn with_extractors(mut self, extractors: Vec<Box<dyn StructuredExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_normalizer(mut self, normalizer: RecipeNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        config: &ExtractionConfig,
    ) -> Result<ExtractionSuccess, ExtractionFailure> {
        let result = match &request.source {
            RecipeSource::Images(images) => {
                self.extract_images(images, &request.allergies, config)
                    .instrument(tracing::info_span!("extract_recipe", source = "images", count = images.len()))
                    .await
            }
            RecipeSource::Url(url) => {
                self.extract_url(url, request, config)
                    .instrument(tracing::info_span!("extract_recipe", source = "url", %url))
                    .await
            }
        };

        if let Err(e) = &result {
            tracing::info!(error = %e, "extraction failed");
        }
        result
    }

    async fn extract_images(
        &self,
        images: &[ImageInput],
        allergies: &[String],
        config: &ExtractionConfig,
    ) -> Result<ExtractionSuccess, ExtractionFailure> {
        if images.is_empty() {
            return Err(AiFailure::new(AiErrorKind::InvalidInput, "no images supplied").into());
        }
        if !config.ai_enabled {
            return Err(AiFailure::disabled().into());
        }

        let success = self
            .ai
            .extract_images(&config.ai_settings(), images, allergies)
            .await?;
        Ok(ExtractionSuccess {
            recipe: success.value,
            used_ai: true,
            method: ExtractionMethod::Ai,
            usage: success.usage,
            attempts: vec![ExtractionAttempt::succeeded(ExtractionMethod::Ai)],
        })
    }

    async fn extract_url(
        &self,
        url: &str,
        request: &ExtractionRequest,
        config: &ExtractionConfig,
    ) -> Result<ExtractionSuccess, ExtractionFailure> {
        if is_video_url(url, &config.video_url_patterns) {
            return self.extract_video(url, &request.allergies, config).await;
        }

        let ai_only = config.always_use_ai || request.force_ai;
        if ai_only && !config.ai_enabled {
            return Err(AiFailure::disabled().into());
        }

        let html = match self.fetcher.fetch_html(url).await {
            Ok(html) if !html.trim().is_empty() => html,
            Ok(_) => {
                return Err(ExtractionFailure::CannotFetch {
                    url: url.to_string(),
                    reason: "empty page".to_string(),
                })
            }
            Err(e) => {
                return Err(ExtractionFailure::CannotFetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        if !looks_like_recipe(&html, &config.schema_indicators, &config.content_indicators) {
            return Err(ExtractionFailure::NotARecipePage);
        }

        let mut attempts = Vec::new();

        if ai_only {
            tracing::info!("AI-only extraction, skipping structured data");
        } else {
            for extractor in &self.extractors {
                let method = extractor.method();
                match extractor.extract(url, &html) {
                    Some(output) if output.is_usable() => {
                        tracing::info!(method = method.as_str(), "structured data usable");
                        attempts.push(ExtractionAttempt::succeeded(method));
                        return Ok(ExtractionSuccess {
                            recipe: self.normalizer.normalize(output),
                            used_ai: false,
                            method,
                            usage: Usage::default(),
                            attempts,
                        });
                    }
                    Some(_) => {
                        tracing::info!(method = method.as_str(), "structured data incomplete");
                        attempts.push(ExtractionAttempt::failed(
                            method,
                            "recipe data incomplete for one measurement system",
                        ));
                    }
                    None => {
                        attempts.push(ExtractionAttempt::failed(method, "no recipe data found"));
                    }
                }
            }

            if !config.ai_enabled {
                tracing::info!("structured extraction failed and AI is disabled");
                return Err(ExtractionFailure::CannotParseRecipe { attempts });
            }
        }

        tracing::info!("falling back to AI extraction");
        let text = page_text(&html);
        match self
            .ai
            .extract_page(&config.ai_settings(), url, &text, &request.allergies)
            .await
        {
            Ok(success) => {
                attempts.push(ExtractionAttempt::succeeded(ExtractionMethod::Ai));
                Ok(ExtractionSuccess {
                    recipe: success.value,
                    used_ai: true,
                    method: ExtractionMethod::Ai,
                    usage: success.usage,
                    attempts,
                })
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "AI extraction failed");
                attempts.push(ExtractionAttempt::failed(
                    ExtractionMethod::Ai,
                    failure.to_string(),
                ));
                Err(ExtractionFailure::CannotParseRecipe { attempts })
            }
        }
    }

    async fn extract_video(
        &self,
        url: &str,
        allergies: &[String],
        config: &ExtractionConfig,
    ) -> Result<ExtractionSuccess, ExtractionFailure> {
        if !config.video_parsing_enabled {
            return Err(ExtractionFailure::VideoParsingDisabled);
        }

        tracing::info!("delegating to video processor");
        let recipe = self.video.process(url, Uuid::new_v4(), allergies).await?;
        Ok(ExtractionSuccess {
            recipe,
            used_ai: true,
            method: ExtractionMethod::Video,
            usage: Usage::default(),
            attempts: vec![ExtractionAttempt::succeeded(ExtractionMethod::Video)],
        })
    }
}
