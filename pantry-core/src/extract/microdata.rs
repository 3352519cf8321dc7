use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Html, Selector};

use super::html::{clean_text, og_image, source_name};
use super::{assign_systems, SourceLines, StructuredExtractor};
use crate::error::ExtractError;
use crate::ingredients::UnitTable;
use crate::types::{DualList, ExtractionMethod, ExtractionOutput, MeasurementSystem};

static RECIPE_SCOPE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[itemtype="http://schema.org/Recipe"], [itemtype="https://schema.org/Recipe"]"#,
    )
    .expect("Invalid selector")
});

static INGREDIENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemprop="recipeIngredient"], [itemprop="ingredients"]"#)
        .expect("Invalid selector")
});

static INSTRUCTIONS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[itemprop="recipeInstructions"], [itemprop="instructions"], [itemtype*="HowToStep"]"#,
    )
    .expect("Invalid selector")
});

static STEP_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="text"]"#).expect("Invalid selector"));

static IMAGES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="image"]"#).expect("Invalid selector"));

static KEYWORDS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="keywords"]"#).expect("Invalid selector"));

/// Reads schema.org Recipe microdata (`itemscope`/`itemprop` attributes).
#[derive(Debug, Clone)]
pub struct MicrodataExtractor {
    units: Arc<UnitTable>,
}

impl Default for MicrodataExtractor {
    fn default() -> Self {
        Self::with_units(Arc::new(UnitTable::standard().clone()))
    }
}

impl MicrodataExtractor {
    pub fn with_units(units: Arc<UnitTable>) -> Self {
        Self { units }
    }

    fn try_extract(&self, url: &str, html: &str) -> Result<ExtractionOutput, ExtractError> {
        let document = Html::parse_document(html);
        let scope = document
            .select(&RECIPE_SCOPE)
            .next()
            .ok_or(ExtractError::NoRecipe)?;

        let name = prop_text(&scope, "name")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExtractError::MissingField("name".to_string()))?;

        let ingredients = tagged_lines(scope.select(&INGREDIENTS).map(|el| (el, element_text(&el))));

        // A HowToStep with an inner itemprop="text" contributes only that text.
        // Skip recipeInstructions wrappers that merely contain HowToSteps.
        let instructions = tagged_lines(
            scope
                .select(&INSTRUCTIONS)
                .filter(|el| {
                    el.value()
                        .attr("itemtype")
                        .is_some_and(|t| t.contains("HowToStep"))
                        || el.select(&INSTRUCTIONS).next().is_none()
                })
                .map(|el| {
                    let text = el
                        .select(&STEP_TEXT)
                        .next()
                        .map(|t| element_text(&t))
                        .unwrap_or_else(|| element_text(&el));
                    (el, text)
                }),
        );

        let (ingredients, instructions) = assign_systems(ingredients, instructions, &self.units);

        let mut images: Vec<String> = scope
            .select(&IMAGES)
            .filter_map(|el| {
                let value = el.value();
                value
                    .attr("src")
                    .or_else(|| value.attr("href"))
                    .or_else(|| value.attr("content"))
                    .map(|s| s.trim().to_string())
            })
            .filter(|s| !s.is_empty())
            .collect();
        if images.is_empty() {
            images.extend(og_image(html));
        }

        let keywords = scope
            .select(&KEYWORDS)
            .flat_map(|el| {
                prop_value(&el)
                    .split(',')
                    .map(clean_text)
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(ExtractionOutput {
            name,
            description: prop_text(&scope, "description").filter(|s| !s.is_empty()),
            images,
            servings: prop_text(&scope, "recipeYield").filter(|s| !s.is_empty()),
            prep_time: prop_text(&scope, "prepTime").filter(|s| !s.is_empty()),
            cook_time: prop_text(&scope, "cookTime").filter(|s| !s.is_empty()),
            total_time: prop_text(&scope, "totalTime").filter(|s| !s.is_empty()),
            ingredients,
            instructions,
            keywords,
            source_url: Some(url.to_string()),
            source_name: source_name(url),
        })
    }
}

impl StructuredExtractor for MicrodataExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Microdata
    }

    fn extract(&self, url: &str, html: &str) -> Option<ExtractionOutput> {
        match self.try_extract(url, html) {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::debug!(url, error = %e, "no microdata recipe");
                None
            }
        }
    }
}

fn element_text(el: &ElementRef) -> String {
    clean_text(&el.text().collect::<String>())
}

/// The `content` attribute wins over the element's text.
fn prop_value(el: &ElementRef) -> String {
    match el.value().attr("content") {
        Some(content) => clean_text(content),
        None => element_text(el),
    }
}

fn prop_text(scope: &ElementRef, prop: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"[itemprop="{}"]"#, prop)).ok()?;
    scope.select(&selector).next().map(|el| prop_value(&el))
}

/// The system named by the closest `data-unit-system` attribute, if any.
fn unit_system_of(el: &ElementRef) -> Option<MeasurementSystem> {
    std::iter::once(**el)
        .chain(el.ancestors())
        .filter_map(ElementRef::wrap)
        .find_map(|ancestor| ancestor.value().attr("data-unit-system"))
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "metric" => Some(MeasurementSystem::Metric),
            "us" | "imperial" => Some(MeasurementSystem::Us),
            _ => None,
        })
}

/// Group lines by their `data-unit-system` container. Lines outside any tagged
/// container are shared by both systems once at least one line is tagged.
fn tagged_lines<'a>(items: impl Iterator<Item = (ElementRef<'a>, String)>) -> SourceLines {
    let mut metric = Vec::new();
    let mut us = Vec::new();
    let mut untagged = Vec::new();
    let mut any_tagged = false;

    for (el, text) in items {
        if text.is_empty() {
            continue;
        }
        match unit_system_of(&el) {
            Some(MeasurementSystem::Metric) => {
                any_tagged = true;
                metric.push(text);
            }
            Some(MeasurementSystem::Us) => {
                any_tagged = true;
                us.push(text);
            }
            None => untagged.push(text),
        }
    }

    if !any_tagged {
        return SourceLines::Plain(untagged);
    }
    metric.extend(untagged.iter().cloned());
    us.extend(untagged);
    SourceLines::Split(DualList::new(metric, us))
}
