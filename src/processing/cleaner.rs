//! Markup stripping and the minimum-length gate.

use scraper::Html;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleaningError {
    #[error("markup parser failed: {0}")]
    Parser(String),
}

/// Turns native document text (possibly HTML) into plain text.
pub trait TextExtractor {
    fn extract(&self, raw: &str) -> Result<String, CleaningError>;
}

/// Tolerant HTML extractor backed by `scraper`.
///
/// Text inside `script`, `style` and `noscript` elements is not part of the
/// document body and is skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlTextExtractor;

const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

impl TextExtractor for HtmlTextExtractor {
    fn extract(&self, raw: &str) -> Result<String, CleaningError> {
        let fragment = Html::parse_fragment(raw);
        let mut parts: Vec<&str> = Vec::new();
        for node in fragment.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()))
            });
            if !hidden {
                parts.push(text);
            }
        }
        Ok(parts.join(" "))
    }
}

/// Collapse every whitespace run into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract and flatten native text. Extraction failures yield an empty string.
pub fn clean_text<X: TextExtractor + ?Sized>(extractor: &X, raw: &str) -> String {
    match extractor.extract(raw) {
        Ok(text) => collapse_whitespace(&text),
        Err(e) => {
            log::warn!("Error stripping markup: {e}. Returning empty string.");
            String::new()
        }
    }
}

/// Length gate counted in characters, not bytes.
pub fn passes_length_gate(clean_text: &str, min_chars: usize) -> bool {
    clean_text.chars().count() >= min_chars
}
