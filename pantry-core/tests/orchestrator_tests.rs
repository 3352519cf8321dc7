//! End-to-end fallback policy tests with in-process fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pantry_core::ai::{
    AiErrorKind, AiExtractionEngine, FakeModel, ModelCapabilities, ProviderConfig, ProviderKind,
    StaticResolver,
};
use pantry_core::{
    DualList, ExtractionConfig, ExtractionFailure, ExtractionMethod, ExtractionOrchestrator,
    ExtractionOutput, ExtractionRequest, ImageInput, MeasurementSystem, MockFetcher,
    NormalizedRecipe, RecipeNormalizer, StructuredExtractor, UnsupportedVideoProcessor,
    VideoError, VideoProcessor,
};
use uuid::Uuid;

const DUAL_JSONLD_PAGE: &str = r#"<html><head><script type="application/ld+json">
{"@context": "https://schema.org", "@type": "Recipe", "name": "Shortbread",
 "recipeIngredient": {"metric": ["225 g butter", "300 g flour"], "us": ["1 cup butter", "2 1/2 cups flour"]},
 "recipeInstructions": {"metric": ["Bake at 160 °C."], "us": ["Bake at 325 °F."]}}
</script></head><body><h1>Shortbread</h1></body></html>"#;

const US_ONLY_JSONLD_PAGE: &str = r#"<html><head><script type="application/ld+json">
{"@context": "https://schema.org", "@type": "Recipe", "name": "Brownies",
 "recipeIngredient": ["1 cup sugar", "1/2 cup butter", "2 tbsp cocoa"],
 "recipeInstructions": ["Mix.", "Bake."]}
</script></head><body><h1>Brownies</h1><p>Fudgy brownies.</p></body></html>"#;

const NOT_A_RECIPE_PAGE: &str =
    "<html><body><h1>Quarterly results</h1><p>Revenue grew.</p></body></html>";

const AI_RESPONSE: &str = r#"{
    "name": "Brownies",
    "description": "Fudgy brownies.",
    "recipeIngredient": {"metric": ["200 g sugar", "115 g butter", "15 g cocoa"], "us": ["1 cup sugar", "1/2 cup butter", "2 tbsp cocoa"]},
    "recipeInstructions": {"metric": ["Mix.", "Bake at 175 °C."], "us": ["Mix.", "Bake at 350 °F."]},
    "image": [],
    "keywords": [],
    "recipeYield": "9",
    "prepTime": null,
    "cookTime": "PT25M",
    "totalTime": null
}"#;

struct Harness {
    fetcher: Arc<MockFetcher>,
    model: Arc<FakeModel>,
    orchestrator: ExtractionOrchestrator,
}

fn harness(fetcher: MockFetcher, model: FakeModel) -> Harness {
    harness_with_video(fetcher, model, Arc::new(UnsupportedVideoProcessor))
}

fn harness_with_video(
    fetcher: MockFetcher,
    model: FakeModel,
    video: Arc<dyn VideoProcessor>,
) -> Harness {
    let fetcher = Arc::new(fetcher);
    let model = Arc::new(model.with_usage(300, 150));
    let resolver = StaticResolver::new(model.clone(), ModelCapabilities::cloud_chat("gpt-4o"));
    let engine = AiExtractionEngine::new(Arc::new(resolver), RecipeNormalizer::default());
    let orchestrator = ExtractionOrchestrator::new(fetcher.clone(), Arc::new(engine), video);
    Harness {
        fetcher,
        model,
        orchestrator,
    }
}

fn ai_config() -> ExtractionConfig {
    ExtractionConfig::with_ai(ProviderConfig::new(ProviderKind::CloudChat, "gpt-4o"))
}

fn no_ai_config() -> ExtractionConfig {
    ExtractionConfig {
        ai_enabled: false,
        ..ai_config()
    }
}

/// Counts calls and never finds anything.
struct SpyExtractor {
    calls: Arc<AtomicUsize>,
}

impl StructuredExtractor for SpyExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::JsonLd
    }

    fn extract(&self, _url: &str, _html: &str) -> Option<ExtractionOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

#[derive(Default)]
struct RecordingVideoProcessor {
    calls: AtomicUsize,
}

#[async_trait]
impl VideoProcessor for RecordingVideoProcessor {
    async fn process(
        &self,
        url: &str,
        recipe_id: Uuid,
        _allergies: &[String],
    ) -> Result<NormalizedRecipe, VideoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = ExtractionOutput {
            name: "Video Ramen".to_string(),
            ingredients: DualList::shared(vec!["2 eggs".to_string()]),
            instructions: DualList::shared(vec!["Boil.".to_string()]),
            source_url: Some(url.to_string()),
            ..Default::default()
        };
        Ok(RecipeNormalizer::default().normalize_with_id(output, recipe_id))
    }
}

#[tokio::test]
async fn test_jsonld_success_never_touches_ai() {
    let url = "https://shortbread.example/classic";
    let h = harness(
        MockFetcher::new().with_html(url, DUAL_JSONLD_PAGE),
        FakeModel::always(AI_RESPONSE),
    );

    let success = h
        .orchestrator
        .extract(&ExtractionRequest::url(url), &ai_config())
        .await
        .unwrap();

    assert!(!success.used_ai);
    assert_eq!(success.method, ExtractionMethod::JsonLd);
    assert_eq!(success.attempts.len(), 1);
    assert!(success.attempts[0].success);
    assert_eq!(success.usage.total_tokens, 0);
    assert_eq!(success.recipe.name, "Shortbread");
    assert_eq!(success.recipe.ingredients.len(), 4);
    assert_eq!(h.model.calls(), 0);
    assert_eq!(h.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_unusable_structured_data_falls_back_to_ai() {
    let url = "https://brownies.example/fudgy";
    let h = harness(
        MockFetcher::new().with_html(url, US_ONLY_JSONLD_PAGE),
        FakeModel::with_response("brownies.example", AI_RESPONSE),
    );

    let success = h
        .orchestrator
        .extract(&ExtractionRequest::url(url), &ai_config())
        .await
        .unwrap();

    assert!(success.used_ai);
    assert_eq!(success.method, ExtractionMethod::Ai);
    let methods: Vec<_> = success.attempts.iter().map(|a| (a.method, a.success)).collect();
    assert_eq!(
        methods,
        vec![
            (ExtractionMethod::JsonLd, false),
            (ExtractionMethod::Microdata, false),
            (ExtractionMethod::Ai, true),
        ]
    );
    assert_eq!(h.model.calls(), 1);
    assert_eq!(success.usage.total_tokens, 450);

    let recipe = &success.recipe;
    assert_eq!(recipe.ingredients.len(), 6);
    assert_eq!(recipe.steps.len(), 4);
    assert_eq!(recipe.ingredients_for(MeasurementSystem::Metric).count(), 3);
    assert_eq!(recipe.source_url.as_deref(), Some(url));

    // The page prompt carries the visible page text, not the markup.
    let prompt = &h.model.requests()[0].messages[0].content;
    assert!(prompt.contains("Fudgy brownies."));
    assert!(!prompt.contains("<h1>"));
}

#[tokio::test]
async fn test_ai_disabled_fails_without_provider_calls() {
    let url = "https://brownies.example/fudgy";
    let h = harness(
        MockFetcher::new().with_html(url, US_ONLY_JSONLD_PAGE),
        FakeModel::always(AI_RESPONSE),
    );

    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::url(url), &no_ai_config())
        .await
        .unwrap_err();

    assert!(matches!(failure, ExtractionFailure::CannotParseRecipe { .. }));
    assert_eq!(failure.to_string(), "cannot parse recipe");
    assert_eq!(failure.attempts().len(), 2);
    assert!(failure.attempts().iter().all(|a| a.method != ExtractionMethod::Ai));
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn test_forced_ai_with_ai_disabled_runs_nothing() {
    let url = "https://shortbread.example/classic";
    let calls = Arc::new(AtomicUsize::new(0));
    let mut h = harness(
        MockFetcher::new().with_html(url, DUAL_JSONLD_PAGE),
        FakeModel::always(AI_RESPONSE),
    );
    h.orchestrator = h.orchestrator.with_extractors(vec![Box::new(SpyExtractor {
        calls: calls.clone(),
    })]);

    let request = ExtractionRequest::url(url).with_force_ai(true);
    let failure = h.orchestrator.extract(&request, &no_ai_config()).await.unwrap_err();
    assert!(matches!(&failure, ExtractionFailure::Ai(f) if f.kind == AiErrorKind::AiDisabled));

    let config = ExtractionConfig {
        always_use_ai: true,
        ..no_ai_config()
    };
    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::url(url), &config)
        .await
        .unwrap_err();
    assert!(matches!(&failure, ExtractionFailure::Ai(f) if f.kind == AiErrorKind::AiDisabled));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn forced_ai_skips_usable_structured_data() {
    let url = "https://shortbread.example/classic";
    let h = harness(
        MockFetcher::new().with_html(url, DUAL_JSONLD_PAGE),
        FakeModel::always(AI_RESPONSE),
    );

    let request = ExtractionRequest::url(url).with_force_ai(true);
    let success = h.orchestrator.extract(&request, &ai_config()).await.unwrap();

    assert!(success.used_ai);
    assert_eq!(success.attempts.len(), 1);
    assert_eq!(success.attempts[0].method, ExtractionMethod::Ai);
    assert_eq!(h.model.calls(), 1);
}

#[tokio::test]
async fn ai_failure_in_fallback_is_cannot_parse() {
    let url = "https://brownies.example/fudgy";
    let h = harness(
        MockFetcher::new().with_html(url, US_ONLY_JSONLD_PAGE),
        FakeModel::failing(500, "upstream exploded"),
    );

    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::url(url), &ai_config())
        .await
        .unwrap_err();

    assert!(matches!(failure, ExtractionFailure::CannotParseRecipe { .. }));
    let last = failure.attempts().last().unwrap();
    assert_eq!(last.method, ExtractionMethod::Ai);
    assert!(last.error.as_deref().unwrap().starts_with("PROVIDER_ERROR"));
}

#[tokio::test]
async fn test_video_url_with_video_disabled_never_fetches() {
    let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
    let video = Arc::new(RecordingVideoProcessor::default());
    let h = harness_with_video(MockFetcher::new(), FakeModel::new(), video.clone());

    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::url(url), &ai_config())
        .await
        .unwrap_err();

    assert!(matches!(failure, ExtractionFailure::VideoParsingDisabled));
    assert_eq!(failure.to_string(), "video parsing disabled");
    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(video.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn video_url_delegates_to_processor() {
    let url = "https://youtu.be/abc123";
    let video = Arc::new(RecordingVideoProcessor::default());
    let h = harness_with_video(MockFetcher::new(), FakeModel::new(), video.clone());
    let config = ExtractionConfig {
        video_parsing_enabled: true,
        ..ai_config()
    };

    let success = h
        .orchestrator
        .extract(&ExtractionRequest::url(url), &config)
        .await
        .unwrap();

    assert!(success.used_ai);
    assert_eq!(success.method, ExtractionMethod::Video);
    assert_eq!(success.recipe.name, "Video Ramen");
    assert_eq!(video.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn unsupported_video_processor_surfaces_error() {
    let h = harness(MockFetcher::new(), FakeModel::new());
    let config = ExtractionConfig {
        video_parsing_enabled: true,
        ..ai_config()
    };
    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::url("https://vimeo.com/12345"), &config)
        .await
        .unwrap_err();
    assert!(matches!(failure, ExtractionFailure::VideoProcessing(_)));
}

#[tokio::test]
async fn fetch_failures_and_non_recipe_pages() {
    let h = harness(
        MockFetcher::new()
            .with_error("https://down.example/", "connection refused")
            .with_html("https://blank.example/", "   ")
            .with_html("https://news.example/", NOT_A_RECIPE_PAGE),
        FakeModel::always(AI_RESPONSE),
    );

    for url in ["https://down.example/", "https://blank.example/"] {
        let failure = h
            .orchestrator
            .extract(&ExtractionRequest::url(url), &ai_config())
            .await
            .unwrap_err();
        assert!(
            matches!(failure, ExtractionFailure::CannotFetch { .. }),
            "{url}: {failure}"
        );
    }

    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::url("https://news.example/"), &ai_config())
        .await
        .unwrap_err();
    assert!(matches!(failure, ExtractionFailure::NotARecipePage));
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn image_sources() {
    let h = harness(MockFetcher::new(), FakeModel::always(AI_RESPONSE));
    let image = ImageInput::from_bytes("image/jpeg", b"not-really-a-jpeg");

    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::images(vec![]), &ai_config())
        .await
        .unwrap_err();
    assert!(matches!(&failure, ExtractionFailure::Ai(f) if f.kind == AiErrorKind::InvalidInput));

    let failure = h
        .orchestrator
        .extract(&ExtractionRequest::images(vec![image.clone()]), &no_ai_config())
        .await
        .unwrap_err();
    assert!(matches!(&failure, ExtractionFailure::Ai(f) if f.kind == AiErrorKind::AiDisabled));
    assert_eq!(h.model.calls(), 0);

    let request = ExtractionRequest::images(vec![image.clone(), image])
        .with_allergies(vec!["Dairy".to_string()]);
    let success = h.orchestrator.extract(&request, &ai_config()).await.unwrap();
    assert!(success.used_ai);
    assert_eq!(success.method, ExtractionMethod::Ai);
    assert_eq!(success.recipe.name, "Brownies");

    let sent = &h.model.requests()[0].messages[0];
    assert_eq!(sent.images.len(), 2);
    assert!(sent.content.contains("\"Dairy\""));
}

#[tokio::test]
async fn orchestrator_serves_concurrent_requests() {
    let urls = ["https://a.example/shortbread", "https://b.example/shortbread"];
    let h = harness(
        MockFetcher::new()
            .with_html(urls[0], DUAL_JSONLD_PAGE)
            .with_html(urls[1], DUAL_JSONLD_PAGE),
        FakeModel::new(),
    );
    let orchestrator = Arc::new(h.orchestrator);

    let handles: Vec<_> = urls
        .iter()
        .map(|url| {
            let orchestrator = orchestrator.clone();
            let request = ExtractionRequest::url(*url);
            tokio::spawn(async move { orchestrator.extract(&request, &no_ai_config()).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let success = handle.await.unwrap().unwrap();
        ids.push(success.recipe.id);
    }
    assert_ne!(ids[0], ids[1]);
    assert_eq!(h.fetcher.calls(), 2);
}
