//! Cheap content classification run before any extraction work.
//!
//! Both checks are best-effort heuristics driven by configurable lists; the
//! defaults below cover the common cases.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;

pub const DEFAULT_SCHEMA_INDICATORS: &[&str] = &[
    "schema.org/recipe",
    "\"@type\":\"recipe\"",
    "\"@type\": \"recipe\"",
    "itemtype=\"http://schema.org/recipe\"",
    "itemtype=\"https://schema.org/recipe\"",
    "wprm-recipe",
    "tasty-recipes",
    "h-recipe",
];

pub const DEFAULT_CONTENT_INDICATORS: &[&str] = &[
    "ingredients",
    "instructions",
    "directions",
    "method",
    "preparation",
    "prep time",
    "cook time",
    "servings",
    "tablespoon",
    "teaspoon",
    "preheat",
    "recipe",
];

pub const DEFAULT_VIDEO_URL_PATTERNS: &[&str] = &[
    r"(?i)^https?://(www\.|m\.)?youtube\.com/(watch\?|shorts/|embed/)",
    r"(?i)^https?://youtu\.be/",
    r"(?i)^https?://(www\.|vm\.|vt\.)?tiktok\.com/",
    r"(?i)^https?://(www\.)?instagram\.com/(reel|reels|p|tv)/",
    r"(?i)^https?://(www\.|m\.)?facebook\.com/.*/videos/",
    r"(?i)^https?://(www\.)?facebook\.com/(watch|reel)/",
    r"(?i)^https?://fb\.watch/",
    r"(?i)^https?://(www\.|player\.)?vimeo\.com/",
];

pub fn default_schema_indicators() -> Vec<String> {
    DEFAULT_SCHEMA_INDICATORS.iter().map(|s| s.to_string()).collect()
}

pub fn default_content_indicators() -> Vec<String> {
    DEFAULT_CONTENT_INDICATORS.iter().map(|s| s.to_string()).collect()
}

pub fn default_video_url_patterns() -> Vec<String> {
    DEFAULT_VIDEO_URL_PATTERNS.iter().map(|s| s.to_string()).collect()
}

/// Video patterns compiled so far, keyed by source. `None` marks an invalid pattern.
static COMPILED_VIDEO_PATTERNS: LazyLock<RwLock<HashMap<String, Option<Regex>>>> =
    LazyLock::new(Default::default);

fn compiled_video_pattern(pattern: &str) -> Option<Regex> {
    if let Some(entry) = COMPILED_VIDEO_PATTERNS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(pattern)
    {
        return entry.clone();
    }

    let compiled = match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "ignoring invalid video URL pattern");
            None
        }
    };
    COMPILED_VIDEO_PATTERNS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(pattern.to_string(), compiled.clone());
    compiled
}

/// True when `url` matches any of the video patterns. Invalid patterns are skipped.
pub fn is_video_url(url: &str, patterns: &[String]) -> bool {
    let url = url.trim();
    patterns
        .iter()
        .filter_map(|pattern| compiled_video_pattern(pattern))
        .any(|re| re.is_match(url))
}

/// Recipe-likelihood check, case-insensitive: one schema indicator, or at
/// least two distinct content indicators.
pub fn looks_like_recipe(
    html: &str,
    schema_indicators: &[String],
    content_indicators: &[String],
) -> bool {
    let haystack = html.to_lowercase();

    let contains = |needle: &String| {
        let needle = needle.trim().to_lowercase();
        !needle.is_empty() && haystack.contains(&needle)
    };

    if schema_indicators.iter().any(&contains) {
        return true;
    }

    content_indicators.iter().filter(|i| contains(*i)).count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_urls() {
        let patterns = default_video_url_patterns();
        for url in [
            "https://www.youtube.com/watch?v=abc",
            "https://youtube.com/shorts/abc",
            "https://youtu.be/abc",
            "https://www.tiktok.com/@chef/video/123",
            "https://www.instagram.com/reel/xyz/",
            "https://www.facebook.com/chef/videos/123",
            "https://fb.watch/abc",
            "https://vimeo.com/12345",
        ] {
            assert!(is_video_url(url, &patterns), "{url} should be a video");
        }
        for url in [
            "https://www.seriouseats.com/pancakes",
            "https://www.youtube.com/",
            "https://www.instagram.com/chef/",
        ] {
            assert!(!is_video_url(url, &patterns), "{url} should not be a video");
        }
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let patterns = vec!["(unclosed".to_string(), r"^https://v\.test/".to_string()];
        assert!(is_video_url("https://v.test/1", &patterns));
        assert!(!is_video_url("https://other.test/1", &patterns));
    }

    #[test]
    fn test_video_patterns_compiled_once() {
        let patterns = vec!["(also-unclosed".to_string(), r"^https://once\.test/".to_string()];
        for _ in 0..3 {
            assert!(is_video_url("https://once.test/clip", &patterns));
        }

        let compiled = COMPILED_VIDEO_PATTERNS.read().unwrap();
        assert!(compiled[&patterns[0]].is_none());
        assert!(compiled[&patterns[1]].is_some());
    }

    #[test]
    fn test_schema_indicator_alone_is_enough() {
        let html = r#"<script type="application/ld+json">{"@context":"https://schema.org","@type":"Recipe"}</script>"#;
        assert!(looks_like_recipe(
            html,
            &default_schema_indicators(),
            &default_content_indicators()
        ));
    }

    #[test]
    fn test_content_indicators_need_two_hits() {
        let schema = default_schema_indicators();
        let content = default_content_indicators();
        assert!(looks_like_recipe("<h2>INGREDIENTS</h2><h2>Directions</h2>", &schema, &content));
        assert!(!looks_like_recipe("<p>Our favourite ingredients</p>", &schema, &content));
        assert!(!looks_like_recipe("<p>Quarterly earnings</p>", &schema, &content));
    }
}
