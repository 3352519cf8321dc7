//! Provider wire-contract tests against a local mock HTTP server.

use std::time::Duration;

use pantry_core::ai::{
    AiErrorKind, AiExtractionEngine, AiExtractor, AiSettings, CapabilityProber, LocalRuntime,
    ModelCapabilities, ModelLister, ProviderConfig, ProviderKind, ProviderRegistry,
};
use pantry_core::RecipeNormalizer;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OLLAMA: ProviderKind = ProviderKind::LocalCompatible(LocalRuntime::Ollama);
const LM_STUDIO: ProviderKind = ProviderKind::LocalCompatible(LocalRuntime::LmStudio);

fn recipe_json() -> String {
    json!({
        "name": "Tomato Soup",
        "description": null,
        "recipeIngredient": {"metric": ["800 g tomatoes", "500 ml stock"], "us": ["28 oz tomatoes", "2 cups stock"]},
        "recipeInstructions": {"metric": ["Simmer 20 minutes.", "Blend."], "us": ["Simmer 20 minutes.", "Blend."]},
        "image": [],
        "keywords": [],
        "recipeYield": "4 servings",
        "prepTime": "PT5M",
        "cookTime": "PT20M",
        "totalTime": null
    })
    .to_string()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 900, "completion_tokens": 210, "total_tokens": 1110}
    })
}

fn engine() -> AiExtractionEngine {
    let registry = ProviderRegistry::new(CapabilityProber::with_timeout(Duration::from_secs(2)));
    AiExtractionEngine::new(Arc::new(registry), RecipeNormalizer::default())
}

#[tokio::test]
async fn test_introspection_timeout_uses_local_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"details": {"families": ["clip"]}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let caps = CapabilityProber::with_timeout(Duration::from_millis(200))
        .probe(OLLAMA, Some(&server.uri()), Some("llama3"))
        .await;
    assert_eq!(caps, ModelCapabilities::LOCAL_DEFAULTS);

    // Name hints still apply when introspection times out
    let caps = CapabilityProber::with_timeout(Duration::from_millis(200))
        .probe(OLLAMA, Some(&server.uri()), Some("llava"))
        .await;
    assert!(caps.supports_vision);
    assert!(!caps.supports_max_tokens);
}

#[tokio::test]
async fn introspection_reads_families() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .and(body_json(json!({"name": "llava:13b"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"details": {"family": "llama", "families": ["llama", "clip"]}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .and(body_json(json!({"name": "llama3"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"details": {"families": ["llama"]}})),
        )
        .mount(&server)
        .await;

    let prober = CapabilityProber::new();
    let endpoint = format!("{}/v1", server.uri());

    let caps = prober.probe(OLLAMA, Some(&endpoint), Some("llava:13b")).await;
    assert!(caps.supports_vision);
    assert!(caps.supports_max_tokens);

    let caps = prober.probe(OLLAMA, Some(&endpoint), Some("llama3")).await;
    assert!(!caps.supports_vision);
    assert!(caps.supports_max_tokens);
}

#[tokio::test]
async fn introspection_error_status_uses_local_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})))
        .mount(&server)
        .await;

    let caps = CapabilityProber::new()
        .probe(OLLAMA, Some(&server.uri()), Some("missing"))
        .await;
    assert_eq!(caps, ModelCapabilities::LOCAL_DEFAULTS);
}

#[tokio::test]
async fn lists_ollama_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3:8b", "details": {"families": ["llama"]}},
                {"name": "llava:13b", "details": {"families": ["llama", "clip"]}},
                {"name": "pixtral-local:latest", "details": {"families": ["LLAMA", "MLLAMA"]}},
                {"name": "qwen2.5-vl:7b"}
            ]
        })))
        .mount(&server)
        .await;

    let models = ModelLister::new()
        .list(OLLAMA, Some(&server.uri()), None)
        .await
        .unwrap();

    let vision: Vec<_> = models
        .iter()
        .map(|m| (m.id.as_str(), m.supports_vision))
        .collect();
    assert_eq!(
        vision,
        vec![
            ("llama3:8b", Some(false)),
            ("llava:13b", Some(true)),
            ("pixtral-local:latest", Some(true)),
            ("qwen2.5-vl:7b", Some(true)),
        ]
    );
}

#[tokio::test]
async fn lists_openai_models_with_chat_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "text-embedding-3-small", "object": "model"},
                {"id": "o3-mini", "object": "model"},
                {"id": "whisper-1", "object": "model"},
                {"id": "gpt-4o", "object": "model"},
                {"id": "dall-e-3", "object": "model"},
                {"id": "ft:gpt-4o-mini:acme::abc123", "object": "model"},
                {"id": "gpt-3.5-turbo", "object": "model"}
            ]
        })))
        .mount(&server)
        .await;

    let endpoint = format!("{}/v1", server.uri());
    let models = ModelLister::new()
        .list(ProviderKind::CloudChat, Some(&endpoint), Some("sk-test"))
        .await
        .unwrap();

    let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["gpt-3.5-turbo", "gpt-4o", "o3-mini"]);
    assert_eq!(models[0].supports_vision, Some(false));
    assert_eq!(models[1].supports_vision, Some(true));
}

#[tokio::test]
async fn lists_lmstudio_models_on_normalized_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "qwen2.5-7b-instruct"}, {"id": "text-embedding-nomic-embed-text-v1.5"}]
        })))
        .mount(&server)
        .await;

    let models = ModelLister::new()
        .list(LM_STUDIO, Some(&format!("{}/", server.uri())), None)
        .await
        .unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "qwen2.5-7b-instruct");
    assert_eq!(models[0].supports_vision, None);
}

#[tokio::test]
async fn listing_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let result = ModelLister::new()
        .list(ProviderKind::CloudChat, Some(&format!("{}/v1", server.uri())), Some("bad"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn engine_end_to_end_against_local_runtime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"details": {"families": ["llama"]}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "max_tokens": 1500,
            "response_format": {"type": "json_schema", "json_schema": {"name": "recipe", "strict": true}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&recipe_json())))
        .expect(1)
        .mount(&server)
        .await;

    let mut provider = ProviderConfig::new(OLLAMA, "llama3").with_endpoint(server.uri());
    provider.generation.max_output_tokens = Some(1500);

    let success = engine()
        .extract_page(
            &AiSettings::enabled(provider),
            "https://soups.example/tomato",
            "Tomato soup. 800 g tomatoes...",
            &["celery".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(success.value.name, "Tomato Soup");
    assert_eq!(success.value.ingredients.len(), 4);
    assert_eq!(success.value.cook_time_minutes, Some(20));
    assert_eq!(success.usage.input_tokens, 900);
    assert_eq!(success.usage.output_tokens, 210);
    assert_eq!(success.usage.total_tokens, 1110);
}

#[tokio::test]
async fn cloud_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-revoked"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "20"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-typo"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "The model `gpt-4o-mni` does not exist"}
        })))
        .mount(&server)
        .await;

    let endpoint = format!("{}/v1", server.uri());
    for (key, model, expected) in [
        ("sk-revoked", "gpt-4o", AiErrorKind::AuthenticationError),
        ("sk-busy", "gpt-4o", AiErrorKind::RateLimited),
        ("sk-typo", "gpt-4o-mni", AiErrorKind::ModelNotFound),
    ] {
        let provider = ProviderConfig::new(ProviderKind::CloudChat, model)
            .with_endpoint(endpoint.clone())
            .with_api_key(key);
        let failure = engine()
            .extract_page(&AiSettings::enabled(provider), "https://x.example", "text", &[])
            .await
            .unwrap_err();
        assert_eq!(failure.kind, expected, "{key}: {failure}");
    }
}

#[tokio::test]
async fn cache_dir_serves_repeat_requests_from_disk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer pplx-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&recipe_json())))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let provider = ProviderConfig::new(ProviderKind::CloudSearch, "sonar")
        .with_endpoint(server.uri())
        .with_api_key("pplx-test")
        .with_cache_dir(temp_dir.path().to_path_buf());
    let settings = AiSettings::enabled(provider);

    for _ in 0..2 {
        let success = engine()
            .extract_page(&settings, "https://soups.example/tomato", "Tomato soup", &[])
            .await
            .unwrap();
        assert_eq!(success.value.name, "Tomato Soup");
    }
}
