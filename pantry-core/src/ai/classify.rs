//! Maps raw provider errors onto the public failure kinds.

use super::error::{AiErrorKind, AiFailure};
use super::model::ProviderError;

/// Longest slice of a provider's error body carried into a failure message.
const MAX_DETAIL_CHARS: usize = 300;

pub fn classify_provider_error(error: &ProviderError) -> AiFailure {
    match error {
        ProviderError::ApiError { status, message } => {
            let detail = truncate(message);
            match status {
                401 | 403 => AiFailure::new(
                    AiErrorKind::AuthenticationError,
                    format!("provider rejected the credentials ({}): {}", status, detail),
                ),
                429 => AiFailure::new(
                    AiErrorKind::RateLimited,
                    format!("provider rate limit reached: {}", detail),
                ),
                404 => AiFailure::new(
                    AiErrorKind::ModelNotFound,
                    format!("model or endpoint not found: {}", detail),
                ),
                408 | 504 => AiFailure::new(
                    AiErrorKind::Timeout,
                    format!("provider timed out ({}): {}", status, detail),
                ),
                _ if is_model_missing(message) => AiFailure::new(
                    AiErrorKind::ModelNotFound,
                    format!("model not available: {}", detail),
                ),
                _ => AiFailure::new(
                    AiErrorKind::ProviderError,
                    format!("provider returned {}: {}", status, detail),
                ),
            }
        }
        ProviderError::RateLimited { retry_after_secs } => AiFailure::new(
            AiErrorKind::RateLimited,
            match retry_after_secs {
                Some(secs) => format!("provider rate limit reached, retry after {}s", secs),
                None => "provider rate limit reached".to_string(),
            },
        ),
        ProviderError::Timeout(e) => AiFailure::new(
            AiErrorKind::Timeout,
            format!("provider did not answer in time: {}", truncate(e)),
        ),
        ProviderError::Connection(e) => AiFailure::new(
            AiErrorKind::NetworkError,
            format!("could not reach provider: {}", truncate(e)),
        ),
        ProviderError::ParseError(e) => AiFailure::new(
            AiErrorKind::MalformedResponse,
            format!("provider response could not be read: {}", truncate(e)),
        ),
        ProviderError::RequestFailed(e) => AiFailure::new(
            AiErrorKind::NetworkError,
            format!("request to provider failed: {}", truncate(e)),
        ),
        ProviderError::Cache(e) => AiFailure::new(
            AiErrorKind::ProviderError,
            format!("response cache failed: {}", truncate(e)),
        ),
    }
}

fn is_model_missing(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("model") && (lower.contains("not found") || lower.contains("does not exist"))
}

fn truncate(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> ProviderError {
        ProviderError::ApiError {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(classify_provider_error(&api(401, "bad key")).kind, AiErrorKind::AuthenticationError);
        assert_eq!(classify_provider_error(&api(403, "forbidden")).kind, AiErrorKind::AuthenticationError);
        assert_eq!(classify_provider_error(&api(429, "slow down")).kind, AiErrorKind::RateLimited);
        assert_eq!(classify_provider_error(&api(404, "nope")).kind, AiErrorKind::ModelNotFound);
        assert_eq!(classify_provider_error(&api(500, "oops")).kind, AiErrorKind::ProviderError);
    }

    #[test]
    fn test_model_missing_in_body() {
        let failure = classify_provider_error(&api(400, "The model `gpt-9` does not exist"));
        assert_eq!(failure.kind, AiErrorKind::ModelNotFound);
    }

    #[test]
    fn test_transport_errors() {
        assert_eq!(
            classify_provider_error(&ProviderError::Timeout("10s".into())).kind,
            AiErrorKind::Timeout
        );
        assert_eq!(
            classify_provider_error(&ProviderError::Connection("refused".into())).kind,
            AiErrorKind::NetworkError
        );
        assert_eq!(
            classify_provider_error(&ProviderError::ParseError("eof".into())).kind,
            AiErrorKind::MalformedResponse
        );
        assert_eq!(
            classify_provider_error(&ProviderError::RateLimited { retry_after_secs: Some(3) }).message,
            "provider rate limit reached, retry after 3s"
        );
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let failure = classify_provider_error(&api(500, &"x".repeat(1000)));
        assert!(failure.message.len() < 400);
        assert!(failure.message.ends_with("..."));
    }
}
