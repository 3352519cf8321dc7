//! OpenAI-compatible chat completions client.
//!
//! OpenAI, Perplexity, Ollama (`/v1`) and LM Studio all speak this wire
//! format, differing only in base URL, auth and a few parameter names.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::model::{
    ChatMessage, GenerationRequest, GenerationResponse, LanguageModel, ProviderError,
    ResponseFormat, Role, Usage,
};

/// Chat completions against `{base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatCompletionsModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    provider: &'static str,
    /// OpenAI's newer models only accept `max_completion_tokens`.
    use_max_completion_tokens: bool,
}

impl ChatCompletionsModel {
    pub fn new(
        provider: &'static str,
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            provider,
            use_max_completion_tokens: false,
        })
    }

    pub fn with_max_completion_tokens(mut self, enabled: bool) -> Self {
        self.use_max_completion_tokens = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn wire_request(&self, request: GenerationRequest) -> WireRequest {
        let (max_tokens, max_completion_tokens) = if self.use_max_completion_tokens {
            (None, request.max_tokens)
        } else {
            (request.max_tokens, None)
        };

        WireRequest {
            model: self.model.clone(),
            messages: request.messages.into_iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            max_tokens,
            max_completion_tokens,
            response_format: match request.response_format {
                ResponseFormat::Text => None,
                ResponseFormat::JsonObject => Some(WireResponseFormat::JsonObject),
                ResponseFormat::JsonSchema(schema) => Some(WireResponseFormat::JsonSchema {
                    json_schema: WireJsonSchema {
                        name: schema.name,
                        schema: schema.schema,
                        strict: true,
                    },
                }),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Serialize)]
struct WireImageUrl {
    url: String,
}

impl From<ChatMessage> for WireMessage {
    fn from(message: ChatMessage) -> Self {
        let content = if message.images.is_empty() {
            WireContent::Text(message.content)
        } else {
            let mut parts = vec![WirePart::Text {
                text: message.content,
            }];
            parts.extend(message.images.iter().map(|image| WirePart::ImageUrl {
                image_url: WireImageUrl {
                    url: image.data_url(),
                },
            }));
            WireContent::Parts(parts)
        };
        Self {
            role: message.role,
            content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireResponseFormat {
    JsonObject,
    JsonSchema { json_schema: WireJsonSchema },
}

#[derive(Debug, Serialize)]
struct WireJsonSchema {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireApiError,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireApiError {
    Detailed { message: String },
    Plain(String),
}

impl WireApiError {
    fn into_message(self) -> String {
        match self {
            WireApiError::Detailed { message } | WireApiError::Plain(message) => message,
        }
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.wire_request(request);

        tracing::debug!(provider = self.provider, model = %self.model, %url, "network: chat completion");

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let text = response.text().await?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<WireErrorResponse>(&text)
                .map(|e| e.error.into_message())
                .unwrap_or(text);
            return Err(ProviderError::ApiError { status, message });
        }

        let parsed: WireResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        let usage = parsed
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens.unwrap_or(u.prompt_tokens + u.completion_tokens),
            })
            .unwrap_or_default();

        Ok(GenerationResponse { content, usage })
    }

    fn provider_name(&self) -> &'static str {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
