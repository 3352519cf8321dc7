//! Maps an [`ExtractionOutput`] to a [`NormalizedRecipe`].
//!
//! Both measurement systems end up in one ingredient list and one step list,
//! metric entries first, each system numbered from zero in source order.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use url::Url;
use uuid::Uuid;

use crate::ingredients::{IngredientParser, RuleBasedParser, UnitTable};
use crate::types::{
    ExtractionOutput, MeasurementSystem, NormalizedRecipe, RecipeIngredient, RecipeStep,
};

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("Invalid ISO duration regex")
});

static PROSE_DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(days?|d|hours?|hrs?|h|minutes?|mins?|m)")
        .expect("Invalid prose duration regex")
});

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid number regex"));

static BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•·▪▢☐◦‣]\s*)+").expect("Invalid bullet regex")
});

static STEP_NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:step\s*\d+\s*[.):\-]?\s*|\d+\s*[.):]\s+|\d+\s+-\s+)")
        .expect("Invalid step number regex")
});

/// Collapse whitespace and drop leading list bullets.
pub fn clean_line(line: &str) -> String {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    BULLET_PREFIX.replace(&collapsed, "").trim().to_string()
}

/// [`clean_line`] plus removal of "1.", "2)" or "Step 3:" prefixes.
pub fn clean_step(line: &str) -> String {
    let line = clean_line(line);
    STEP_NUMBER_PREFIX.replace(&line, "").trim().to_string()
}

/// Minutes in an ISO 8601 duration ("PT1H30M") or a prose one ("1 hr 15 mins").
/// A bare number is read as minutes.
pub fn parse_duration_minutes(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DURATION.captures(s) {
        let part = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        let minutes = part(1) * 1440.0 + part(2) * 60.0 + part(3) + (part(4) / 60.0).ceil();
        return to_minutes(minutes);
    }

    if let Ok(n) = s.parse::<u32>() {
        return (n > 0).then_some(n);
    }

    let mut minutes = 0.0;
    let mut matched = false;
    for caps in PROSE_DURATION_PART.captures_iter(s) {
        let Ok(value) = caps[1].replace(',', ".").parse::<f64>() else {
            continue;
        };
        let unit = caps[2].to_ascii_lowercase();
        minutes += match unit.chars().next() {
            Some('d') => value * 1440.0,
            Some('h') => value * 60.0,
            _ => value,
        };
        matched = true;
    }
    if matched {
        to_minutes(minutes)
    } else {
        None
    }
}

fn to_minutes(minutes: f64) -> Option<u32> {
    let rounded = minutes.round();
    (rounded >= 1.0 && rounded <= u32::MAX as f64).then_some(rounded as u32)
}

/// First positive integer in a yield string ("Serves 4-6" gives 4).
pub fn parse_servings(s: &str) -> Option<u32> {
    FIRST_NUMBER
        .find(s)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

/// Resolve relative image URLs against `base`, keep http(s) only, drop duplicates.
pub fn resolve_images(images: &[String], base: Option<&str>) -> Vec<String> {
    let base = base.and_then(|b| Url::parse(b).ok());
    let mut result: Vec<String> = Vec::new();
    for image in images {
        let image = image.trim();
        if image.is_empty() {
            continue;
        }
        let resolved = match Url::parse(image) {
            Ok(url) => Some(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                base.as_ref().and_then(|b| b.join(image).ok())
            }
            Err(_) => None,
        };
        let Some(url) = resolved.filter(|u| matches!(u.scheme(), "http" | "https")) else {
            tracing::debug!(image, "dropping unresolvable image URL");
            continue;
        };
        let url = url.to_string();
        if !result.contains(&url) {
            result.push(url);
        }
    }
    result
}

/// Trim and de-duplicate case-insensitively, keeping the first spelling.
pub fn dedupe_keywords(keywords: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = clean_line(keyword);
        if keyword.is_empty() {
            continue;
        }
        if !result.iter().any(|k| k.eq_ignore_ascii_case(&keyword)) {
            result.push(keyword);
        }
    }
    result
}

/// Turns raw candidates into canonical recipes.
#[derive(Clone)]
pub struct RecipeNormalizer {
    parser: Arc<dyn IngredientParser>,
    units: Arc<UnitTable>,
}

impl fmt::Debug for RecipeNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeNormalizer")
            .field("units", &self.units.units().len())
            .finish_non_exhaustive()
    }
}

impl Default for RecipeNormalizer {
    fn default() -> Self {
        Self::new(
            Arc::new(RuleBasedParser),
            Arc::new(UnitTable::standard().clone()),
        )
    }
}

impl RecipeNormalizer {
    pub fn new(parser: Arc<dyn IngredientParser>, units: Arc<UnitTable>) -> Self {
        Self { parser, units }
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    pub fn normalize(&self, output: ExtractionOutput) -> NormalizedRecipe {
        self.normalize_with_id(output, Uuid::new_v4())
    }

    pub fn normalize_with_id(&self, output: ExtractionOutput, id: Uuid) -> NormalizedRecipe {
        let mut ingredients = Vec::new();
        let mut steps = Vec::new();

        for system in MeasurementSystem::ALL {
            let lines: Vec<String> = output
                .ingredients
                .get(system)
                .iter()
                .map(|l| clean_line(l))
                .filter(|l| !l.is_empty())
                .collect();
            let parsed = self.parser.parse(&lines, &self.units);
            ingredients.extend(lines.into_iter().zip(parsed).enumerate().map(
                |(order, (raw, parsed))| RecipeIngredient {
                    system,
                    order,
                    quantity: parsed.quantity,
                    unit_id: parsed.unit_id,
                    description: parsed.description,
                    raw,
                },
            ));

            steps.extend(
                output
                    .instructions
                    .get(system)
                    .iter()
                    .map(|l| clean_step(l))
                    .filter(|l| !l.is_empty())
                    .enumerate()
                    .map(|(order, text)| RecipeStep {
                        system,
                        order,
                        text,
                    }),
            );
        }

        let system_used = if output.ingredients.metric.is_empty() && !output.ingredients.us.is_empty()
        {
            MeasurementSystem::Us
        } else {
            MeasurementSystem::Metric
        };

        let source_name = output.source_name.clone().or_else(|| {
            output
                .source_url
                .as_deref()
                .and_then(crate::extract::html::source_name)
        });

        NormalizedRecipe {
            id,
            name: clean_line(&output.name),
            description: output
                .description
                .as_deref()
                .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|d| !d.is_empty()),
            images: resolve_images(&output.images, output.source_url.as_deref()),
            servings: output.servings.as_deref().and_then(parse_servings),
            prep_time_minutes: output.prep_time.as_deref().and_then(parse_duration_minutes),
            cook_time_minutes: output.cook_time.as_deref().and_then(parse_duration_minutes),
            total_time_minutes: output.total_time.as_deref().and_then(parse_duration_minutes),
            system_used,
            ingredients,
            steps,
            keywords: dedupe_keywords(&output.keywords),
            source_url: output.source_url,
            source_name,
        }
    }
}
