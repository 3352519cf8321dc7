//! Model listing for model pickers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::capabilities::{has_vision_family, name_suggests_vision, ModelCapabilities};
use super::config::{LocalRuntime, ProviderKind};
use super::endpoint::{api_root, normalize_endpoint};
use super::model::ProviderError;

pub const LOCAL_LIST_TIMEOUT: Duration = Duration::from_secs(5);
pub const CLOUD_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Ids containing any of these are not chat models.
const NON_CHAT_MARKERS: &[&str] = &[
    "embedding", "whisper", "tts", "dall-e", "davinci", "babbage", "curie", "ada",
];

const PERPLEXITY_MODELS: &[(&str, &str)] = &[
    ("sonar", "Sonar"),
    ("sonar-pro", "Sonar Pro"),
    ("sonar-reasoning", "Sonar Reasoning"),
    ("sonar-reasoning-pro", "Sonar Reasoning Pro"),
    ("sonar-deep-research", "Sonar Deep Research"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModel {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_vision: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
    #[serde(default)]
    details: Option<TagsDetails>,
}

#[derive(Debug, Deserialize)]
struct TagsDetails {
    #[serde(default)]
    families: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelsEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelsEntry {
    id: String,
}

/// True for ids that can hold a chat conversation.
pub fn is_chat_model(id: &str) -> bool {
    let lower = id.to_ascii_lowercase();
    !lower.starts_with("ft:") && !NON_CHAT_MARKERS.iter().any(|m| lower.contains(m))
}

#[derive(Debug, Clone, Default)]
pub struct ModelLister {
    client: reqwest::Client,
}

impl ModelLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// List chat models offered by a provider.
    ///
    /// `endpoint` falls back to the vendor URL for cloud kinds and is required for local ones.
    pub async fn list(
        &self,
        kind: ProviderKind,
        endpoint: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Vec<AvailableModel>, ProviderError> {
        let endpoint = endpoint
            .map(str::to_string)
            .or_else(|| kind.default_endpoint().map(str::to_string))
            .ok_or_else(|| {
                ProviderError::RequestFailed(format!("no endpoint configured for {}", kind))
            })?;
        let endpoint = normalize_endpoint(&endpoint, kind.is_local());

        match kind {
            ProviderKind::CloudSearch => Ok(PERPLEXITY_MODELS
                .iter()
                .map(|(id, name)| AvailableModel {
                    id: id.to_string(),
                    display_name: name.to_string(),
                    supports_vision: Some(false),
                })
                .collect()),
            ProviderKind::LocalCompatible(LocalRuntime::Ollama) => self.list_ollama(&endpoint).await,
            ProviderKind::LocalCompatible(LocalRuntime::LmStudio) => {
                self.list_openai_compatible(&endpoint, api_key, LOCAL_LIST_TIMEOUT, |_| None)
                    .await
            }
            ProviderKind::CloudChat => {
                self.list_openai_compatible(&endpoint, api_key, CLOUD_LIST_TIMEOUT, |id| {
                    Some(ModelCapabilities::cloud_chat(id).supports_vision)
                })
                .await
            }
        }
    }

    async fn list_ollama(&self, endpoint: &str) -> Result<Vec<AvailableModel>, ProviderError> {
        let url = format!("{}/api/tags", api_root(endpoint));
        tracing::debug!(%url, "network: listing local models");

        let response = self
            .client
            .get(&url)
            .timeout(LOCAL_LIST_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(tags
            .models
            .into_iter()
            .filter(|m| is_chat_model(&m.name))
            .map(|m| {
                let family_vision = m
                    .details
                    .and_then(|d| d.families)
                    .is_some_and(|f| has_vision_family(&f));
                AvailableModel {
                    supports_vision: Some(family_vision || name_suggests_vision(&m.name)),
                    display_name: m.name.clone(),
                    id: m.name,
                }
            })
            .collect())
    }

    async fn list_openai_compatible(
        &self,
        endpoint: &str,
        api_key: Option<&str>,
        timeout: Duration,
        vision: impl Fn(&str) -> Option<bool>,
    ) -> Result<Vec<AvailableModel>, ProviderError> {
        let url = format!("{}/models", endpoint);
        tracing::debug!(%url, "network: listing models");

        let mut request = self.client.get(&url).timeout(timeout);
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            request = request.bearer_auth(key);
        }
        let response = check_status(request.send().await?).await?;
        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let mut listed: Vec<AvailableModel> = models
            .data
            .into_iter()
            .filter(|m| is_chat_model(&m.id))
            .map(|m| AvailableModel {
                supports_vision: vision(&m.id),
                display_name: m.id.clone(),
                id: m.id,
            })
            .collect();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError {
        status: status.as_u16(),
        message,
    })
}
