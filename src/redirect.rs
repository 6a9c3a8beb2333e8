//! One-shot position redirect.
//!
//! Stateless counterpart of the scheduler: resolve the position once and
//! decide where the page should go.

use crate::bounds::BoundingBox;
use crate::error::RefreshError;
use crate::position::Position;

/// What the page should do with a resolved position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Go to this path.
    Navigate(String),
    /// Already on the right page.
    Reload,
}

/// Strip one trailing slash, leaving `/` alone.
pub fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        if let Some(prefix) = path.strip_suffix('/') {
            return prefix;
        }
    }
    path
}

/// Decide the navigation for `position` given the page's current path.
///
/// # Errors
///
/// [`RefreshError::OutOfRegion`] if the position is outside `region`.
pub fn navigation_for(
    position: &Position,
    current_path: &str,
    region: &BoundingBox,
) -> Result<Navigation, RefreshError> {
    let Position {
        latitude,
        longitude,
        ..
    } = *position;
    if !region.contains(latitude, longitude) {
        return Err(RefreshError::OutOfRegion {
            latitude,
            longitude,
        });
    }

    let target = rainwatch_fetch::coords_path(latitude, longitude);
    if normalize(current_path) == target {
        Ok(Navigation::Reload)
    } else {
        Ok(Navigation::Navigate(target))
    }
}
