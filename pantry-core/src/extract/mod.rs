//! Structured-data recipe extraction.
//!
//! Each extractor looks at one kind of embedded markup and produces a raw
//! [`ExtractionOutput`] candidate. Extractors never fail loudly: malformed or
//! missing markup yields `None` and the caller moves on to the next strategy.

pub mod html;
pub mod jsonld;
pub mod microdata;

pub use jsonld::JsonLdExtractor;
pub use microdata::MicrodataExtractor;

use crate::ingredients::UnitTable;
use crate::types::{DualList, ExtractionMethod, ExtractionOutput};

/// A strategy that reads recipe data embedded in a page.
pub trait StructuredExtractor: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    /// Extract a candidate from `html`, fetched from `url`.
    ///
    /// Returns `None` when the page carries no Recipe-typed data or it cannot be parsed.
    /// A returned candidate may still be unusable; callers check
    /// [`ExtractionOutput::is_usable`].
    fn extract(&self, url: &str, html: &str) -> Option<ExtractionOutput>;
}

/// JSON-LD first, then microdata.
pub fn default_extractors() -> Vec<Box<dyn StructuredExtractor>> {
    vec![
        Box::new(JsonLdExtractor::default()),
        Box::new(MicrodataExtractor::default()),
    ]
}

/// A list as found in markup: either plain, or already split per measurement system.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SourceLines {
    Plain(Vec<String>),
    Split(DualList),
}

/// Distribute extracted lists over the two measurement systems.
///
/// Plain ingredient lists go to whichever system their units mostly belong to,
/// or to both when no system-specific unit shows up. Plain instructions follow
/// the ingredients.
pub(crate) fn assign_systems(
    ingredients: SourceLines,
    instructions: SourceLines,
    units: &UnitTable,
) -> (DualList, DualList) {
    let detected = match &ingredients {
        SourceLines::Plain(lines) => units.detect_system(lines),
        SourceLines::Split(_) => None,
    };

    let place = |lines: SourceLines| match lines {
        SourceLines::Split(dual) => dual,
        SourceLines::Plain(lines) => match detected {
            Some(system) => DualList::single(system, lines),
            None => DualList::shared(lines),
        },
    };

    (place(ingredients), place(instructions))
}
