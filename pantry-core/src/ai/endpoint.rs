//! Endpoint URL handling.

use std::sync::LazyLock;

use regex::Regex;

static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/v\d+$").expect("Invalid version suffix regex"));

/// Trim whitespace and trailing slashes. For local OpenAI-compatible runtimes
/// also make sure the path ends in a versioned API segment, appending `/v1`
/// when there is none. Applying it twice gives the same result.
pub fn normalize_endpoint(raw: &str, local: bool) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if local && !VERSION_SUFFIX.is_match(trimmed) {
        format!("{}/v1", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Server root without the versioned API segment, for native endpoints like
/// Ollama's `/api/show`.
pub fn api_root(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    VERSION_SUFFIX.replace(trimmed, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_gets_version_suffix() {
        assert_eq!(
            normalize_endpoint(" http://localhost:11434/ ", true),
            "http://localhost:11434/v1"
        );
        assert_eq!(
            normalize_endpoint("http://localhost:1234/v1//", true),
            "http://localhost:1234/v1"
        );
        assert_eq!(
            normalize_endpoint("http://gpu-box:8080/api/v2", true),
            "http://gpu-box:8080/api/v2"
        );
    }

    #[test]
    fn test_cloud_left_alone() {
        assert_eq!(
            normalize_endpoint("https://api.perplexity.ai/", false),
            "https://api.perplexity.ai"
        );
    }

    #[test]
    fn test_idempotent() {
        for (raw, local) in [
            ("http://localhost:11434", true),
            ("http://localhost:11434/v1/", true),
            ("https://api.openai.com/v1", false),
            ("https://proxy.internal/openai/", false),
        ] {
            let once = normalize_endpoint(raw, local);
            assert_eq!(normalize_endpoint(&once, local), once);
        }
    }

    #[test]
    fn test_api_root() {
        assert_eq!(api_root("http://localhost:11434/v1"), "http://localhost:11434");
        assert_eq!(api_root("http://localhost:11434/"), "http://localhost:11434");
    }
}
