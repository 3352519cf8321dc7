use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Empty response body from {0}")]
    EmptyBody(String),

    #[error("Content unavailable: {0}")]
    Unavailable(String),
}

/// Internal failure of a structured extractor. Never leaves the extractor:
/// `StructuredExtractor::extract` collapses it to `None`.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No Recipe found in structured data")]
    NoRecipe,

    #[error("Invalid JSON-LD: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required setting: {0}")]
    Missing(String),
}

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Video processing failed: {0}")]
    Processing(String),

    #[error("Unsupported video URL: {0}")]
    Unsupported(String),
}
