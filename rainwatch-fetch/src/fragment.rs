//! Fragment extraction: find the content anchor in a server response.
//!
//! The forecast server returns a full HTML document. Only the inner HTML of
//! the element carrying the anchor id is merged into the live view.

use crate::error::{FetchError, Result};
use scraper::{Html, Selector};

/// Extract the inner HTML of the element whose id is `anchor_id`.
///
/// # Errors
///
/// Returns [`FetchError::Structural`] if no element carries the id, or
/// [`FetchError::Config`] if the id cannot form a selector.
pub fn extract_fragment(html: &str, anchor_id: &str) -> Result<String> {
    let selector = anchor_selector(anchor_id)?;
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .next()
        .map(|element| element.inner_html())
        .ok_or_else(|| FetchError::Structural {
            anchor: anchor_id.to_owned(),
        })
}

/// Flatten an HTML fragment into readable text.
///
/// Used by text-only views; markup is dropped and whitespace collapsed.
pub fn fragment_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let raw: String = parsed.root_element().text().collect::<Vec<_>>().join(" ");
    normalise_whitespace(&raw)
}

// Attribute form instead of `#id` so ids starting with a digit still parse.
fn anchor_selector(anchor_id: &str) -> Result<Selector> {
    let query = format!("[id=\"{anchor_id}\"]");
    Selector::parse(&query)
        .map_err(|e| FetchError::Config(format!("invalid anchor id {anchor_id:?}: {e}")))
}

/// One line per text line, inner runs of whitespace reduced to a single
/// space, at most one blank line in a row, none at either end.
fn normalise_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        let after_blank = lines.last().map_or(true, String::is_empty);
        if line.is_empty() && after_blank {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}
