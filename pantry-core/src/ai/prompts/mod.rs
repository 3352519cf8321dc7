//! Prompt templates for AI recipe extraction.
//!
//! Every prompt is the shared base template, then the allergy fragment, then
//! the modality-specific context. All builders are pure.

pub mod image;
pub mod page;
pub mod video;

pub use image::{render_image_prompt, IMAGE_PROMPT_NAME};
pub use page::{render_page_prompt, PAGE_PROMPT_NAME, PAGE_TEXT_BUDGET};
pub use video::{render_video_prompt, VIDEO_PROMPT_NAME};

pub const BASE_PROMPT: &str = r#"You are a recipe extraction assistant. Extract exactly one recipe from the content below and return it as JSON matching the provided schema.

Measurement systems:
- "recipeIngredient" and "recipeInstructions" each have a "metric" list and a "us" list.
- Fill BOTH lists. Write metric quantities (g, kg, ml, l, °C) in "metric" and US customary quantities (cups, tbsp, tsp, oz, lb, °F) in "us".
- Convert quantities that are only given in one system. Keep item counts (eggs, cloves) as written.
- Instructions are the same steps in the same order in both lists, with temperatures and quantities converted.

Rules:
- One ingredient or one step per list entry. No numbering, bullets or headings.
- Keep wording close to the source. Do not invent ingredients or steps.
- Times are ISO 8601 durations such as "PT1H15M". Use null when a time is not given.
- "recipeYield" is the servings or yield as written, or null.
- "image" lists absolute image URLs from the source, or is empty.
- Return ONLY the JSON, no other text."#;

/// Trim, drop blanks and de-duplicate case-insensitively, keeping first-seen order.
pub fn normalize_allergies(allergies: &[String]) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    let mut result = Vec::new();
    for allergy in allergies {
        let trimmed = allergy.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            result.push(trimmed.to_string());
        }
    }
    result
}

/// Keyword instructions. With allergens the model may only tag those; without
/// any it must leave keywords empty.
pub fn render_allergy_fragment(allergies: &[String]) -> String {
    let allergies = normalize_allergies(allergies);
    if allergies.is_empty() {
        return "Keywords:\n- Skip tag detection. Return an empty \"keywords\" list.".to_string();
    }

    let list = allergies
        .iter()
        .map(|a| format!("\"{}\"", a))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Keywords:\n- The user tracks these allergens: {list}.\n- Put an allergen in \"keywords\" only if the recipe contains it, spelled exactly as given.\n- \"keywords\" must contain nothing except entries from that list."
    )
}

pub(crate) fn assemble(allergies: &[String], context: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        BASE_PROMPT,
        render_allergy_fragment(allergies),
        context
    )
}
