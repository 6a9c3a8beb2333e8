//! User-visible failure reporting.

use crate::view::ViewSurface;
use tracing::warn;

/// Prefix of every reported line.
pub const ERROR_PREFIX: &str = "Error: ";

/// Shown when a failure carries no usable message.
pub const FALLBACK_MESSAGE: &str = "something went wrong while updating the forecast";

/// Writes one line describing the latest failure into the error region.
///
/// Each report replaces the previous one; nothing is queued.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn report<V: ViewSurface + ?Sized>(&self, view: &V, message: Option<&str>) {
        let line = format_report(message);
        warn!("{line}");
        view.set_error(&line);
    }
}

/// The line [`ErrorReporter::report`] writes. Blank messages use the fallback.
pub fn format_report(message: Option<&str>) -> String {
    match message {
        Some(msg) if !msg.trim().is_empty() => format!("{ERROR_PREFIX}{msg}"),
        _ => format!("{ERROR_PREFIX}{FALLBACK_MESSAGE}"),
    }
}
