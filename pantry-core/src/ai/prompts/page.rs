//! Prompt for extracting a recipe from webpage text.

use super::assemble;

/// Prompt name for logs.
pub const PAGE_PROMPT_NAME: &str = "page_extract";

/// Characters of page text sent to the model.
pub const PAGE_TEXT_BUDGET: usize = 12_000;

/// Cut `text` to at most `budget` characters.
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn render_page_prompt(url: &str, page_text: &str, allergies: &[String]) -> String {
    let text = truncate_chars(page_text.trim(), PAGE_TEXT_BUDGET);
    let context = format!(
        "Source: a webpage.\nURL: {url}\n\nPage text:\n\"\"\"\n{text}\n\"\"\"",
        url = url.trim(),
        text = text
    );
    assemble(allergies, &context)
}
