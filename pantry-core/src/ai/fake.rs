//! Fake language model for testing.
//!
//! Returns deterministic responses based on prompt matching, so tests run
//! without network access or API costs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use super::model::{GenerationRequest, GenerationResponse, LanguageModel, ProviderError, Usage};

/// A fake model.
///
/// Responses are matched by checking if any message contains a registered
/// substring (case-insensitive). Every call is counted and recorded.
#[derive(Debug)]
pub struct FakeModel {
    model: String,
    responses: RwLock<Vec<(String, String)>>,
    default_response: Option<String>,
    failure: Option<(u16, String)>,
    usage: Usage,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Default for FakeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeModel {
    /// A fake with no registered responses; unmatched prompts fail.
    pub fn new() -> Self {
        Self {
            model: "fake-model".to_string(),
            responses: RwLock::new(Vec::new()),
            default_response: None,
            failure: None,
            usage: Usage::default(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every prompt containing `prompt_contains` with `response`.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let model = Self::new();
        model.add_response(prompt_contains, response);
        model
    }

    /// Answer every prompt with `response`.
    pub fn always(response: &str) -> Self {
        Self::new().with_default_response(response)
    }

    /// Fail every call with an API error carrying `status`.
    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            failure: Some((status, message.to_string())),
            ..Self::new()
        }
    }

    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        if let Ok(mut responses) = self.responses.write() {
            responses.push((prompt_contains.to_lowercase(), response.to_string()));
        }
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    pub fn with_model_name(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.usage = Usage::new(input_tokens, output_tokens);
        self
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if let Some((status, message)) = &self.failure {
            return Err(ProviderError::ApiError {
                status: *status,
                message: message.clone(),
            });
        }

        let matched = self.responses.read().ok().and_then(|responses| {
            responses
                .iter()
                .find(|(pattern, _)| prompt.contains(pattern))
                .map(|(_, response)| response.clone())
        });

        match matched.or_else(|| self.default_response.clone()) {
            Some(content) => Ok(GenerationResponse {
                content,
                usage: self.usage,
            }),
            None => Err(ProviderError::RequestFailed(format!(
                "FakeModel: no response configured for prompt (first 100 chars): {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
