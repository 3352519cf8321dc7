//! AI recipe extraction.
//!
//! One core runs every modality: resolve the provider, probe what the model
//! accepts, build the prompt, ask for schema-constrained JSON, validate it and
//! normalize the result. All failures come back as [`AiFailure`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::capabilities::ModelCapabilities;
use super::classify::classify_provider_error;
use super::config::{GenerationSettings, ProviderConfig};
use super::error::{AiErrorKind, AiFailure, AiResult, AiSuccess};
use super::model::{ChatMessage, GenerationRequest, LanguageModel, ResponseFormat};
use super::prompts::{
    render_image_prompt, render_page_prompt, render_video_prompt, IMAGE_PROMPT_NAME,
    PAGE_PROMPT_NAME, VIDEO_PROMPT_NAME,
};
use super::registry::{ModelResolver, ProviderRegistry};
use super::schema::{recipe_response_schema, AiRecipePayload};
use crate::normalize::RecipeNormalizer;
use crate::types::{ImageInput, NormalizedRecipe};
use crate::video::VideoMetadata;

/// Used when the operator did not pick a temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Whether AI extraction may run and against which provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

impl AiSettings {
    pub fn enabled(provider: ProviderConfig) -> Self {
        Self {
            enabled: true,
            provider: Some(provider),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait AiExtractor: Send + Sync {
    async fn extract_page(
        &self,
        settings: &AiSettings,
        url: &str,
        page_text: &str,
        allergies: &[String],
    ) -> AiResult<NormalizedRecipe>;

    async fn extract_transcript(
        &self,
        settings: &AiSettings,
        metadata: &VideoMetadata,
        transcript: &str,
        allergies: &[String],
    ) -> AiResult<NormalizedRecipe>;

    async fn extract_images(
        &self,
        settings: &AiSettings,
        images: &[ImageInput],
        allergies: &[String],
    ) -> AiResult<NormalizedRecipe>;
}

#[derive(Clone, Copy)]
enum AiInput<'a> {
    Page { url: &'a str, text: &'a str },
    Transcript {
        metadata: &'a VideoMetadata,
        transcript: &'a str,
    },
    Images(&'a [ImageInput]),
}

impl AiInput<'_> {
    fn prompt_name(&self) -> &'static str {
        match self {
            AiInput::Page { .. } => PAGE_PROMPT_NAME,
            AiInput::Transcript { .. } => VIDEO_PROMPT_NAME,
            AiInput::Images(_) => IMAGE_PROMPT_NAME,
        }
    }

    fn source_url(&self) -> Option<&str> {
        match self {
            AiInput::Page { url, .. } => Some(*url),
            AiInput::Transcript { metadata, .. } => Some(metadata.url.as_str()),
            AiInput::Images(_) => None,
        }
    }

    fn render(&self, allergies: &[String]) -> String {
        match self {
            AiInput::Page { url, text } => render_page_prompt(url, text, allergies),
            AiInput::Transcript {
                metadata,
                transcript,
            } => render_video_prompt(metadata, transcript, allergies),
            AiInput::Images(images) => render_image_prompt(images.len(), allergies),
        }
    }
}

/// Adjust requested sampling settings to what the model accepts.
pub fn resolve_generation(
    requested: &GenerationSettings,
    capabilities: &ModelCapabilities,
) -> GenerationSettings {
    let temperature = if capabilities.supports_temperature {
        let t = requested
            .temperature
            .filter(|t| t.is_finite())
            .unwrap_or(DEFAULT_TEMPERATURE);
        Some(t.clamp(0.0, capabilities.max_temperature))
    } else {
        None
    };
    let max_output_tokens = requested
        .max_output_tokens
        .filter(|_| capabilities.supports_max_tokens);
    GenerationSettings {
        temperature,
        max_output_tokens,
    }
}

/// Strip a Markdown code fence some models wrap JSON in.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse model output into a payload, separating empty from malformed.
fn parse_payload(content: &str) -> Result<AiRecipePayload, AiFailure> {
    let content = strip_code_fence(content);
    if content.is_empty() {
        return Err(AiFailure::new(
            AiErrorKind::EmptyResponse,
            "model returned no content",
        ));
    }

    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| {
        AiFailure::new(
            AiErrorKind::MalformedResponse,
            format!("response is not valid JSON: {}", e),
        )
    })?;

    match &value {
        serde_json::Value::Null => {
            return Err(AiFailure::new(AiErrorKind::EmptyResponse, "model returned null"))
        }
        serde_json::Value::Object(map) if map.is_empty() => {
            return Err(AiFailure::new(
                AiErrorKind::EmptyResponse,
                "model returned an empty object",
            ))
        }
        serde_json::Value::Object(_) => {}
        _ => {
            return Err(AiFailure::new(
                AiErrorKind::MalformedResponse,
                "response is not a JSON object",
            ))
        }
    }

    serde_json::from_value(value).map_err(|e| {
        AiFailure::new(
            AiErrorKind::MalformedResponse,
            format!("response does not match the recipe schema: {}", e),
        )
    })
}

/// The production [`AiExtractor`].
#[derive(Clone)]
pub struct AiExtractionEngine {
    resolver: Arc<dyn ModelResolver>,
    normalizer: RecipeNormalizer,
}

impl std::fmt::Debug for AiExtractionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiExtractionEngine")
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl Default for AiExtractionEngine {
    fn default() -> Self {
        Self::new(Arc::new(ProviderRegistry::default()), RecipeNormalizer::default())
    }
}

impl AiExtractionEngine {
    pub fn new(resolver: Arc<dyn ModelResolver>, normalizer: RecipeNormalizer) -> Self {
        Self {
            resolver,
            normalizer,
        }
    }

    async fn run(
        &self,
        settings: &AiSettings,
        input: AiInput<'_>,
        allergies: &[String],
    ) -> AiResult<NormalizedRecipe> {
        if !settings.enabled {
            return Err(AiFailure::disabled());
        }
        if let AiInput::Images(images) = input {
            if images.is_empty() {
                return Err(AiFailure::new(
                    AiErrorKind::InvalidInput,
                    "at least one image is required",
                ));
            }
        }

        let provider = settings.provider.as_ref().ok_or_else(|| {
            AiFailure::new(
                AiErrorKind::ConfigurationError,
                "AI is enabled but no provider is configured",
            )
        })?;
        let models = self.resolver.resolve(provider)?;
        let model: Arc<dyn LanguageModel> = match input {
            AiInput::Images(_) => models.vision_model,
            _ => models.model,
        };

        let span = tracing::info_span!(
            "ai_extract",
            prompt = input.prompt_name(),
            provider = models.provider_name,
            model = %model.model_name(),
        );

        async move {
            let capabilities = self.resolver.capabilities(provider, model.model_name()).await;
            if matches!(input, AiInput::Images(_)) && !capabilities.supports_vision {
                return Err(AiFailure::new(
                    AiErrorKind::InvalidInput,
                    format!("model {} does not accept image input", model.model_name()),
                ));
            }
            let generation = resolve_generation(&provider.generation, &capabilities);

            let prompt = input.render(allergies);
            let message = match input {
                AiInput::Images(images) => ChatMessage::user_with_images(prompt, images.to_vec()),
                _ => ChatMessage::user(prompt),
            };
            let response_format = if capabilities.supports_structured_output {
                ResponseFormat::JsonSchema(recipe_response_schema())
            } else {
                ResponseFormat::JsonObject
            };

            let request = GenerationRequest {
                messages: vec![message],
                temperature: generation.temperature,
                max_tokens: generation.max_output_tokens,
                response_format,
            };

            let response = model.generate(request).await.map_err(|e| {
                let failure = classify_provider_error(&e);
                tracing::warn!(kind = failure.kind.as_str(), error = %e, "AI provider call failed");
                failure
            })?;

            let payload = parse_payload(&response.content)?;
            payload.validate().map_err(|problem| {
                AiFailure::new(AiErrorKind::ValidationError, problem.to_string())
            })?;

            let recipe = self
                .normalizer
                .normalize(payload.into_output(input.source_url()));
            tracing::info!(
                name = %recipe.name,
                ingredients = recipe.ingredients.len(),
                steps = recipe.steps.len(),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "AI extraction succeeded"
            );

            Ok(AiSuccess {
                value: recipe,
                usage: response.usage,
            })
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl AiExtractor for AiExtractionEngine {
    async fn extract_page(
        &self,
        settings: &AiSettings,
        url: &str,
        page_text: &str,
        allergies: &[String],
    ) -> AiResult<NormalizedRecipe> {
        self.run(
            settings,
            AiInput::Page {
                url,
                text: page_text,
            },
            allergies,
        )
        .await
    }

    async fn extract_transcript(
        &self,
        settings: &AiSettings,
        metadata: &VideoMetadata,
        transcript: &str,
        allergies: &[String],
    ) -> AiResult<NormalizedRecipe> {
        self.run(
            settings,
            AiInput::Transcript {
                metadata,
                transcript,
            },
            allergies,
        )
        .await
    }

    async fn extract_images(
        &self,
        settings: &AiSettings,
        images: &[ImageInput],
        allergies: &[String],
    ) -> AiResult<NormalizedRecipe> {
        self.run(settings, AiInput::Images(images), allergies).await
    }
}
