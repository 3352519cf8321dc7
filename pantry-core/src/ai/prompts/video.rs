//! Prompt for extracting a recipe from a video transcript.

use super::assemble;
use crate::video::VideoMetadata;

pub const VIDEO_PROMPT_NAME: &str = "video_extract";

pub fn render_video_prompt(
    metadata: &VideoMetadata,
    transcript: &str,
    allergies: &[String],
) -> String {
    let mut context = format!("Source: a cooking video.\nURL: {}\n", metadata.url.trim());
    if let Some(title) = metadata.title.as_deref().filter(|t| !t.trim().is_empty()) {
        context.push_str(&format!("Title: {}\n", title.trim()));
    }
    if let Some(uploader) = metadata.uploader.as_deref().filter(|u| !u.trim().is_empty()) {
        context.push_str(&format!("Channel: {}\n", uploader.trim()));
    }
    if let Some(description) = metadata.description.as_deref().filter(|d| !d.trim().is_empty()) {
        context.push_str(&format!(
            "\nVideo description (often lists the ingredients):\n\"\"\"\n{}\n\"\"\"\n",
            description.trim()
        ));
    }
    context.push_str(&format!(
        "\nTranscript (spoken, may be informal; infer quantities mentioned aloud):\n\"\"\"\n{}\n\"\"\"",
        transcript.trim()
    ));
    assemble(allergies, &context)
}
