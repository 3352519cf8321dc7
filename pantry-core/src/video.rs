//! Video source collaborator.
//!
//! Downloading and transcribing a video is out of scope for the core; callers
//! plug in a [`VideoProcessor`]. Implementations typically fetch metadata and
//! a transcript, then hand both to [`crate::ai::AiExtractor::extract_transcript`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VideoError;
use crate::types::NormalizedRecipe;

/// What is known about a video before its transcript is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub duration_secs: Option<u64>,
}

#[async_trait]
pub trait VideoProcessor: Send + Sync {
    /// Turn a video URL into a recipe whose id is `recipe_id`.
    async fn process(
        &self,
        url: &str,
        recipe_id: Uuid,
        allergies: &[String],
    ) -> Result<NormalizedRecipe, VideoError>;
}

/// Processor for deployments without video support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedVideoProcessor;

#[async_trait]
impl VideoProcessor for UnsupportedVideoProcessor {
    async fn process(
        &self,
        url: &str,
        _recipe_id: Uuid,
        _allergies: &[String],
    ) -> Result<NormalizedRecipe, VideoError> {
        Err(VideoError::Unsupported(url.to_string()))
    }
}
