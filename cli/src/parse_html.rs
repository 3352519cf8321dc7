use anyhow::{Context, Result};
use pantry_core::{default_extractors, ExtractionMethod, NormalizedRecipe, RecipeNormalizer};
use std::fs;
use std::path::Path;

/// Run the structured extractors over a saved page, without network or AI.
/// Outputs JSON to stdout (the normalized recipe on success or an error message on failure).
pub fn parse_html(file: &Path, source_url: &str) -> Result<()> {
    let html = fs::read_to_string(file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;

    match extract_structured(&html, source_url) {
        Some((method, recipe)) => {
            let json = serde_json::json!({
                "method": method,
                "recipe": recipe,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
        None => {
            let error_json = serde_json::json!({
                "error": "no usable structured recipe data found"
            });
            println!("{}", serde_json::to_string_pretty(&error_json)?);
            // Return error so exit code is non-zero
            Err(anyhow::anyhow!(
                "Failed to extract recipe from {}",
                file.display()
            ))
        }
    }
}

fn extract_structured(html: &str, source_url: &str) -> Option<(ExtractionMethod, NormalizedRecipe)> {
    let normalizer = RecipeNormalizer::default();
    default_extractors().iter().find_map(|extractor| {
        extractor
            .extract(source_url, html)
            .filter(|output| output.is_usable())
            .map(|output| (extractor.method(), normalizer.normalize(output)))
    })
}
