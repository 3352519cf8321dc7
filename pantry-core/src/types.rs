use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Measurement system a list of ingredients or steps is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSystem {
    #[default]
    Metric,
    Us,
}

impl MeasurementSystem {
    /// Both systems in the order they appear in a normalized recipe.
    pub const ALL: [MeasurementSystem; 2] = [MeasurementSystem::Metric, MeasurementSystem::Us];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementSystem::Metric => "metric",
            MeasurementSystem::Us => "us",
        }
    }
}

/// A list carried once per measurement system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DualList {
    #[serde(default)]
    pub metric: Vec<String>,
    #[serde(default)]
    pub us: Vec<String>,
}

impl DualList {
    pub fn new(metric: Vec<String>, us: Vec<String>) -> Self {
        Self { metric, us }
    }

    /// The same lines for both systems (unit-less content reads the same either way).
    pub fn shared(lines: Vec<String>) -> Self {
        Self {
            metric: lines.clone(),
            us: lines,
        }
    }

    /// Put all lines under one system, leaving the other empty.
    pub fn single(system: MeasurementSystem, lines: Vec<String>) -> Self {
        match system {
            MeasurementSystem::Metric => Self::new(lines, Vec::new()),
            MeasurementSystem::Us => Self::new(Vec::new(), lines),
        }
    }

    pub fn get(&self, system: MeasurementSystem) -> &[String] {
        match system {
            MeasurementSystem::Metric => &self.metric,
            MeasurementSystem::Us => &self.us,
        }
    }

    /// True when both systems have at least one entry.
    pub fn is_complete(&self) -> bool {
        !self.metric.is_empty() && !self.us.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.metric.is_empty() && self.us.is_empty()
    }
}

/// Raw recipe candidate produced by a structured extractor or the AI engine,
/// before normalization. Fields are lightly cleaned strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub servings: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    pub ingredients: DualList,
    pub instructions: DualList,
    pub keywords: Vec<String>,
    pub source_url: Option<String>,
    pub source_name: Option<String>,
}

impl ExtractionOutput {
    /// An output is usable only when both systems carry ingredients and instructions.
    pub fn is_usable(&self) -> bool {
        self.ingredients.is_complete() && self.instructions.is_complete()
    }
}

/// Identifies which strategy produced a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    JsonLd,
    Microdata,
    Ai,
    Video,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::JsonLd => "json_ld",
            ExtractionMethod::Microdata => "microdata",
            ExtractionMethod::Ai => "ai",
            ExtractionMethod::Video => "video",
        }
    }
}

/// Result of attempting a single extraction strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    pub method: ExtractionMethod,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionAttempt {
    pub fn succeeded(method: ExtractionMethod) -> Self {
        Self {
            method,
            success: true,
            error: None,
        }
    }

    pub fn failed(method: ExtractionMethod, error: impl Into<String>) -> Self {
        Self {
            method,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// One ingredient line of a normalized recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub system: MeasurementSystem,
    /// Zero-based position within `system`.
    pub order: usize,
    pub quantity: Option<f64>,
    pub unit_id: Option<String>,
    pub description: String,
    /// Cleaned source line the fields were parsed from.
    pub raw: String,
}

/// One instruction step of a normalized recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub system: MeasurementSystem,
    /// Zero-based position within `system`.
    pub order: usize,
    pub text: String,
}

/// Canonical recipe record. Ingredients and steps hold both systems,
/// metric entries first, each system keeping its source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecipe {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub servings: Option<u32>,
    pub prep_time_minutes: Option<u32>,
    pub cook_time_minutes: Option<u32>,
    pub total_time_minutes: Option<u32>,
    pub system_used: MeasurementSystem,
    pub ingredients: Vec<RecipeIngredient>,
    pub steps: Vec<RecipeStep>,
    pub keywords: Vec<String>,
    pub source_url: Option<String>,
    pub source_name: Option<String>,
}

impl NormalizedRecipe {
    pub fn ingredients_for(
        &self,
        system: MeasurementSystem,
    ) -> impl Iterator<Item = &RecipeIngredient> + '_ {
        self.ingredients.iter().filter(move |i| i.system == system)
    }

    pub fn steps_for(&self, system: MeasurementSystem) -> impl Iterator<Item = &RecipeStep> + '_ {
        self.steps.iter().filter(move |s| s.system == system)
    }
}

/// Image handed to a vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInput {
    /// MIME type, e.g. "image/jpeg".
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

impl ImageInput {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}
