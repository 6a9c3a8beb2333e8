//! View surface the refresh loop writes into.
//!
//! A page has two addressable regions: the error region and the content
//! region. The scheduler only ever writes whole regions; it never reads
//! back what it wrote.

use rainwatch_fetch::fragment_text;
use std::sync::{Arc, Mutex, PoisonError};

/// Capability to update the two regions of the rendered page.
pub trait ViewSurface {
    /// Replace the error region with `text`. An empty string clears it.
    fn set_error(&self, text: &str);

    /// Replace the content region's children with the `html` fragment.
    fn set_content(&self, html: &str);

    /// Empty the error region.
    fn clear_error(&self) {
        self.set_error("");
    }
}

impl<V: ViewSurface + ?Sized> ViewSurface for &V {
    fn set_error(&self, text: &str) {
        (**self).set_error(text);
    }

    fn set_content(&self, html: &str) {
        (**self).set_content(html);
    }

    fn clear_error(&self) {
        (**self).clear_error();
    }
}

/// Region contents held by [`MemoryView`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRegions {
    pub error: String,
    pub content: String,
    /// Number of `set_content` calls so far.
    pub content_writes: usize,
}

/// In-memory view; clones share the same regions.
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    regions: Arc<Mutex<ViewRegions>>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-rendered content, as served on first page load.
    pub fn with_content(html: &str) -> Self {
        let view = Self::default();
        view.regions().content = html.to_owned();
        view
    }

    pub fn snapshot(&self) -> ViewRegions {
        self.regions().clone()
    }

    pub fn error(&self) -> String {
        self.regions().error.clone()
    }

    pub fn content(&self) -> String {
        self.regions().content.clone()
    }

    fn regions(&self) -> std::sync::MutexGuard<'_, ViewRegions> {
        self.regions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ViewSurface for MemoryView {
    fn set_error(&self, text: &str) {
        self.regions().error = text.to_owned();
    }

    fn set_content(&self, html: &str) {
        let mut regions = self.regions();
        regions.content = html.to_owned();
        regions.content_writes += 1;
    }
}

/// Renders regions to the terminal: content as plain text on stdout,
/// errors on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalView;

impl ViewSurface for TerminalView {
    fn set_error(&self, text: &str) {
        if !text.is_empty() {
            eprintln!("{text}");
        }
    }

    fn set_content(&self, html: &str) {
        println!("{}\n", fragment_text(html));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_view_starts_empty() {
        let view = MemoryView::new();
        assert_eq!(view.snapshot(), ViewRegions::default());
    }

    #[test]
    fn set_content_replaces_previous_content() {
        let view = MemoryView::with_content("<p>loading</p>");
        view.set_content("X");
        view.set_content("Y");
        assert_eq!(view.content(), "Y");
        assert_eq!(view.snapshot().content_writes, 2);
    }

    #[test]
    fn set_error_overwrites() {
        let view = MemoryView::new();
        view.set_error("first");
        view.set_error("second");
        assert_eq!(view.error(), "second");
    }

    #[test]
    fn clear_error_empties_region() {
        let view = MemoryView::new();
        view.set_error("boom");
        view.clear_error();
        assert!(view.error().is_empty());
    }

    #[test]
    fn clones_share_regions() {
        let view = MemoryView::new();
        let observer = view.clone();
        view.set_content("shared");
        assert_eq!(observer.content(), "shared");
    }

    #[test]
    fn reference_forwards_to_view() {
        let view = MemoryView::new();
        let by_ref = &view;
        by_ref.set_content("via ref");
        assert_eq!(view.content(), "via ref");
    }
}
