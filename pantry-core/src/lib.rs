pub mod ai;
pub mod charset;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingredients;
pub mod normalize;
pub mod orchestrator;
pub mod types;
pub mod video;

pub use config::ExtractionConfig;
pub use error::{ConfigError, ExtractError, FetchError, VideoError};
pub use extract::{default_extractors, JsonLdExtractor, MicrodataExtractor, StructuredExtractor};
pub use fetch::{ContentFetcher, HttpFetcher, MockFetcher};
pub use ingredients::{IngredientParser, ParsedIngredient, RuleBasedParser, Unit, UnitTable};
pub use normalize::RecipeNormalizer;
pub use orchestrator::{
    ExtractionFailure, ExtractionOrchestrator, ExtractionRequest, ExtractionSuccess, RecipeSource,
};
pub use types::{
    DualList, ExtractionAttempt, ExtractionMethod, ExtractionOutput, ImageInput,
    MeasurementSystem, NormalizedRecipe, RecipeIngredient, RecipeStep,
};
pub use video::{UnsupportedVideoProcessor, VideoMetadata, VideoProcessor};
