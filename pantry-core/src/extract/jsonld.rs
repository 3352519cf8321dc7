use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use super::html::{clean_text, og_image, source_name};
use super::{assign_systems, SourceLines, StructuredExtractor};
use crate::error::ExtractError;
use crate::ingredients::UnitTable;
use crate::types::{DualList, ExtractionMethod, ExtractionOutput};

/// Regex to find JSON-LD script tags (case-insensitive for type attribute)
static JSONLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("Invalid JSON-LD regex")
});

/// Reads `<script type="application/ld+json">` blocks.
#[derive(Debug, Clone)]
pub struct JsonLdExtractor {
    units: Arc<UnitTable>,
}

impl Default for JsonLdExtractor {
    fn default() -> Self {
        Self::with_units(Arc::new(UnitTable::standard().clone()))
    }
}

impl JsonLdExtractor {
    pub fn with_units(units: Arc<UnitTable>) -> Self {
        Self { units }
    }

    fn try_extract(&self, url: &str, html: &str) -> Result<ExtractionOutput, ExtractError> {
        let mut last_error = ExtractError::NoRecipe;

        for cap in JSONLD_REGEX.captures_iter(html) {
            let Some(json_text) = cap.get(1) else {
                continue;
            };

            let sanitized = sanitize_json(json_text.as_str());
            let json: Value = match serde_json::from_str(&sanitized) {
                Ok(v) => v,
                Err(e) => {
                    last_error = ExtractError::InvalidJson(e.to_string());
                    continue;
                }
            };

            if let Some(recipe) = find_recipe(&json) {
                let mut output = self.recipe_to_output(recipe, url)?;
                if output.images.is_empty() {
                    output.images.extend(og_image(html));
                }
                return Ok(output);
            }
        }

        Err(last_error)
    }

    fn recipe_to_output(&self, recipe: &Value, url: &str) -> Result<ExtractionOutput, ExtractError> {
        let name = recipe
            .get("name")
            .and_then(Value::as_str)
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExtractError::MissingField("name".to_string()))?;

        let ingredients = recipe
            .get("recipeIngredient")
            .or_else(|| recipe.get("ingredients"))
            .map(|v| source_lines(v, collect_ingredients))
            .unwrap_or(SourceLines::Plain(Vec::new()));

        let instructions = recipe
            .get("recipeInstructions")
            .map(|v| source_lines(v, collect_instructions))
            .unwrap_or(SourceLines::Plain(Vec::new()));

        let (ingredients, instructions) = assign_systems(ingredients, instructions, &self.units);

        Ok(ExtractionOutput {
            name,
            description: text_field(recipe, "description"),
            images: image_urls(recipe),
            servings: recipe.get("recipeYield").and_then(yield_text),
            prep_time: text_field(recipe, "prepTime"),
            cook_time: text_field(recipe, "cookTime"),
            total_time: text_field(recipe, "totalTime"),
            ingredients,
            instructions,
            keywords: recipe.get("keywords").map(keywords).unwrap_or_default(),
            source_url: Some(url.to_string()),
            source_name: source_name(url),
        })
    }
}

impl StructuredExtractor for JsonLdExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::JsonLd
    }

    fn extract(&self, url: &str, html: &str) -> Option<ExtractionOutput> {
        match self.try_extract(url, html) {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::debug!(url, error = %e, "no JSON-LD recipe");
                None
            }
        }
    }
}

/// Escape raw control characters that some sites leave inside JSON strings.
fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                _ => result.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
        }
    }

    result
}

fn is_recipe_type(value: &Value) -> bool {
    match value {
        Value::String(s) => s == "Recipe" || s.ends_with("/Recipe"),
        Value::Array(arr) => arr.iter().any(is_recipe_type),
        _ => false,
    }
}

/// Depth-first search for a Recipe-typed object, looking through `@graph` first.
fn find_recipe(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            if obj.get("@type").is_some_and(is_recipe_type) {
                return Some(json);
            }
            if let Some(recipe) = obj.get("@graph").and_then(find_recipe) {
                return Some(recipe);
            }
            obj.iter()
                .filter(|(key, _)| key.as_str() != "@graph")
                .find_map(|(_, value)| find_recipe(value))
        }
        Value::Array(arr) => arr.iter().find_map(find_recipe),
        _ => None,
    }
}

/// A dual `{metric: [...], us: [...]}` object, or a plain list handled by `collect`.
fn source_lines(value: &Value, collect: fn(&Value, &mut Vec<String>)) -> SourceLines {
    if let Value::Object(obj) = value {
        if obj.contains_key("metric") || obj.contains_key("us") {
            let mut metric = Vec::new();
            let mut us = Vec::new();
            if let Some(v) = obj.get("metric") {
                collect(v, &mut metric);
            }
            if let Some(v) = obj.get("us") {
                collect(v, &mut us);
            }
            return SourceLines::Split(DualList::new(metric, us));
        }
    }

    let mut lines = Vec::new();
    collect(value, &mut lines);
    SourceLines::Plain(lines)
}

fn collect_ingredients(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(
            s.lines()
                .map(clean_text)
                .filter(|line| !line.is_empty()),
        ),
        Value::Array(arr) => {
            for item in arr {
                match item {
                    Value::String(s) => push_clean(out, s),
                    Value::Object(obj) => {
                        if let Some(text) = obj
                            .get("text")
                            .or_else(|| obj.get("name"))
                            .and_then(Value::as_str)
                        {
                            push_clean(out, text);
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

/// Strings, `HowToStep` objects and `HowToSection.itemListElement`, flattened in order.
fn collect_instructions(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(
            s.split('\n')
                .map(clean_text)
                .filter(|line| !line.is_empty()),
        ),
        Value::Array(arr) => {
            for item in arr {
                collect_instructions(item, out);
            }
        }
        Value::Object(obj) => {
            if let Some(items) = obj.get("itemListElement") {
                collect_instructions(items, out);
            } else if let Some(text) = obj
                .get("text")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)
            {
                push_clean(out, text);
            }
        }
        _ => {}
    }
}

fn push_clean(out: &mut Vec<String>, raw: &str) {
    let cleaned = clean_text(raw);
    if !cleaned.is_empty() {
        out.push(cleaned);
    }
}

fn text_field(recipe: &Value, key: &str) -> Option<String> {
    recipe
        .get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

fn yield_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(arr) => arr.iter().find_map(yield_text),
        _ => None,
    }
}

/// Image URLs from a string, an array, or an `ImageObject`.
fn image_urls(recipe: &Value) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
            Value::Array(arr) => arr.iter().for_each(|item| collect(item, out)),
            Value::Object(obj) => {
                if let Some(url) = obj
                    .get("url")
                    .or_else(|| obj.get("contentUrl"))
                    .and_then(Value::as_str)
                {
                    out.push(url.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let mut urls = Vec::new();
    if let Some(image) = recipe.get("image") {
        collect(image, &mut urls);
    }
    urls
}

fn keywords(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(clean_text)
            .filter(|k| !k.is_empty())
            .collect(),
        Value::Array(arr) => arr.iter().flat_map(keywords).collect(),
        _ => Vec::new(),
    }
}
