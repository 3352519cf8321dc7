//! Structured-output schema for AI recipe extraction and the matching
//! response type.

use serde::Deserialize;
use serde_json::{json, Value};

use super::model::ResponseSchema;
use crate::normalize::{clean_line, clean_step};
use crate::types::{DualList, ExtractionOutput};

pub const RECIPE_SCHEMA_NAME: &str = "recipe";

fn dual_list_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "metric": {"type": "array", "items": {"type": "string"}},
            "us": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["metric", "us"],
        "additionalProperties": false
    })
}

fn nullable_string(description: &str) -> Value {
    json!({"type": ["string", "null"], "description": description})
}

/// JSON schema the model must answer with. Strict mode requires every
/// property to be listed in `required`, so optional fields are nullable.
pub fn recipe_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": "Recipe title"},
            "description": nullable_string("Short summary of the dish"),
            "recipeIngredient": dual_list_schema("One ingredient per entry, per measurement system"),
            "recipeInstructions": dual_list_schema("One step per entry, per measurement system"),
            "image": {"type": "array", "items": {"type": "string"}},
            "keywords": {"type": "array", "items": {"type": "string"}},
            "recipeYield": nullable_string("Servings or yield as written"),
            "prepTime": nullable_string("ISO 8601 duration"),
            "cookTime": nullable_string("ISO 8601 duration"),
            "totalTime": nullable_string("ISO 8601 duration")
        },
        "required": [
            "name",
            "description",
            "recipeIngredient",
            "recipeInstructions",
            "image",
            "keywords",
            "recipeYield",
            "prepTime",
            "cookTime",
            "totalTime"
        ],
        "additionalProperties": false
    })
}

pub fn recipe_response_schema() -> ResponseSchema {
    ResponseSchema {
        name: RECIPE_SCHEMA_NAME.to_string(),
        schema: recipe_schema(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// What a model returned. Lenient on shape: the schema is not enforced by
/// every provider, so validation happens afterwards.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecipePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Kept as raw JSON: a flat array here is a validation problem, not a parse error.
    #[serde(default)]
    recipe_ingredient: Option<Value>,
    #[serde(default)]
    recipe_instructions: Option<Value>,
    #[serde(default)]
    image: Option<OneOrMany>,
    #[serde(default)]
    keywords: Option<OneOrMany>,
    #[serde(default)]
    recipe_yield: Option<Value>,
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub cook_time: Option<String>,
    #[serde(default)]
    pub total_time: Option<String>,
}

/// Why a payload failed the hard gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadProblem {
    MissingName,
    EmptyList(&'static str),
}

impl std::fmt::Display for PayloadProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadProblem::MissingName => write!(f, "response has no recipe name"),
            PayloadProblem::EmptyList(field) => write!(f, "response has an empty {} list", field),
        }
    }
}

/// Read `{"metric": [..], "us": [..]}`; any other shape yields empty lists.
/// Entries are cleaned with `clean` and dropped when nothing is left.
fn dual_list(value: Option<&Value>, clean: fn(&str) -> String) -> DualList {
    let lines = |key: &str| -> Vec<String> {
        value
            .and_then(|v| v.get(key))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(clean)
                    .filter(|l| !l.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    };
    match value {
        Some(Value::Object(_)) => DualList::new(lines("metric"), lines("us")),
        _ => DualList::default(),
    }
}

impl AiRecipePayload {
    pub fn ingredients(&self) -> DualList {
        dual_list(self.recipe_ingredient.as_ref(), clean_line)
    }

    pub fn instructions(&self) -> DualList {
        dual_list(self.recipe_instructions.as_ref(), clean_step)
    }

    /// Check the name and all four system lists, after line cleanup.
    pub fn validate(&self) -> Result<(), PayloadProblem> {
        if self.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(PayloadProblem::MissingName);
        }
        let ingredients = self.ingredients();
        let instructions = self.instructions();
        for (field, lines) in [
            ("metric ingredient", &ingredients.metric),
            ("US ingredient", &ingredients.us),
            ("metric instruction", &instructions.metric),
            ("US instruction", &instructions.us),
        ] {
            if lines.is_empty() {
                return Err(PayloadProblem::EmptyList(field));
            }
        }
        Ok(())
    }

    pub fn into_output(self, source_url: Option<&str>) -> ExtractionOutput {
        let ingredients = self.ingredients();
        let instructions = self.instructions();
        let servings = self.recipe_yield.and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(items) => items.into_iter().find_map(|i| match i {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            _ => None,
        });

        ExtractionOutput {
            name: self.name.unwrap_or_default().trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            images: self.image.map(OneOrMany::into_vec).unwrap_or_default(),
            servings,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            total_time: self.total_time,
            ingredients,
            instructions,
            keywords: self.keywords.map(OneOrMany::into_vec).unwrap_or_default(),
            source_url: source_url.map(str::to_string),
            source_name: source_url.and_then(crate::extract::html::source_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_strict() {
        let schema = recipe_schema();
        assert_eq!(schema["additionalProperties"], false);
        let properties = schema["properties"].as_object().unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(properties.len(), required.len());
        for key in properties.keys() {
            assert!(required.contains(&key.as_str()), "{key} not required");
        }
        assert_eq!(
            schema["properties"]["recipeIngredient"]["required"],
            json!(["metric", "us"])
        );
    }

    #[test]
    fn test_payload_validation() {
        let payload: AiRecipePayload = serde_json::from_value(json!({
            "name": "Pancakes",
            "recipeIngredient": {"metric": ["250 g flour"], "us": ["2 cups flour"]},
            "recipeInstructions": {"metric": ["Mix."], "us": []}
        }))
        .unwrap();
        assert_eq!(
            payload.validate(),
            Err(PayloadProblem::EmptyList("US instruction"))
        );

        let payload: AiRecipePayload = serde_json::from_value(json!({"name": "  "})).unwrap();
        assert_eq!(payload.validate(), Err(PayloadProblem::MissingName));
    }

    #[test]
    fn test_validation_sees_cleaned_lines() {
        let payload: AiRecipePayload = serde_json::from_value(json!({
            "name": "Toast",
            "recipeIngredient": {"metric": ["•", "- "], "us": ["1 slice bread"]},
            "recipeInstructions": {"metric": ["Step 1:"], "us": ["Toast it."]}
        }))
        .unwrap();
        assert_eq!(
            payload.validate(),
            Err(PayloadProblem::EmptyList("metric ingredient"))
        );

        let payload: AiRecipePayload = serde_json::from_value(json!({
            "name": "Toast",
            "recipeIngredient": {"metric": ["1 slice bread", "•"], "us": ["1 slice bread"]},
            "recipeInstructions": {"metric": ["Step 1:"], "us": ["Toast it."]}
        }))
        .unwrap();
        assert_eq!(
            payload.validate(),
            Err(PayloadProblem::EmptyList("metric instruction"))
        );
    }

    #[test]
    fn test_flat_lists_fail_validation() {
        let payload: AiRecipePayload = serde_json::from_value(json!({
            "name": "Eggs",
            "recipeIngredient": ["2 eggs"],
            "recipeInstructions": ["Boil."]
        }))
        .unwrap();
        assert!(payload.ingredients().is_empty());
        assert_eq!(
            payload.validate(),
            Err(PayloadProblem::EmptyList("metric ingredient"))
        );
    }

    #[test]
    fn test_into_output_accepts_loose_shapes() {
        let payload: AiRecipePayload = serde_json::from_value(json!({
            "name": " Soup ",
            "description": "",
            "recipeIngredient": {"metric": ["1 l stock"], "us": ["4 cups stock"]},
            "recipeInstructions": {"metric": ["Simmer."], "us": ["Simmer."]},
            "image": "https://example.com/soup.jpg",
            "keywords": ["gluten"],
            "recipeYield": 4,
            "prepTime": "PT10M",
            "cookTime": null,
            "totalTime": null
        }))
        .unwrap();
        assert!(payload.validate().is_ok());

        let output = payload.into_output(Some("https://www.soups.com/a"));
        assert_eq!(output.name, "Soup");
        assert_eq!(output.description, None);
        assert_eq!(output.images, vec!["https://example.com/soup.jpg"]);
        assert_eq!(output.servings.as_deref(), Some("4"));
        assert_eq!(output.source_name.as_deref(), Some("Soups.com"));
        assert!(output.is_usable());
    }

    #[test]
    fn test_into_output_drops_empty_entries() {
        let payload: AiRecipePayload = serde_json::from_value(json!({
            "name": "Toast",
            "recipeIngredient": {"metric": ["- 1 slice bread", "•"], "us": ["1 slice bread", 3]},
            "recipeInstructions": {"metric": ["1. Toast it.", "Step 2:"], "us": ["Toast it."]}
        }))
        .unwrap();
        assert!(payload.validate().is_ok());

        let output = payload.into_output(None);
        assert_eq!(output.ingredients.metric, vec!["1 slice bread"]);
        assert_eq!(output.ingredients.us, vec!["1 slice bread"]);
        assert_eq!(output.instructions.metric, vec!["Toast it."]);
    }
}
