//! Prompt for extracting recipes from photos.

use super::assemble;

pub const IMAGE_PROMPT_NAME: &str = "image_extract";

pub fn render_image_prompt(image_count: usize, allergies: &[String]) -> String {
    let context = if image_count <= 1 {
        "Source: a photo of a recipe from a cookbook, card or printed page. Read the text in the image.".to_string()
    } else {
        format!(
            "Source: {image_count} photos. They are consecutive pages of ONE recipe, in order. Combine them into a single recipe; do not return one recipe per photo."
        )
    };
    assemble(allergies, &context)
}
