//! One tick: position, bounds check, fetch.
//!
//! The tick only produces a [`FetchOutcome`]; applying it to the view is the
//! runner's job, since an outcome may turn out to be stale.

use crate::bounds::BoundingBox;
use crate::error::RefreshError;
use crate::fetcher::FragmentSource;
use crate::position::PositionSource;
use std::time::Duration;
use tracing::debug;

/// Result of one tick.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Fragment HTML to merge into the content region.
    Success(String),
    /// Why the tick failed.
    Failure(RefreshError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<String, RefreshError>> for FetchOutcome {
    fn from(result: Result<String, RefreshError>) -> Self {
        match result {
            Ok(html) => Self::Success(html),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Run one tick. Bounds are checked before any request is made.
pub async fn run_tick<P, F>(
    source: &P,
    fetcher: &F,
    region: &BoundingBox,
    max_position_age: Duration,
) -> FetchOutcome
where
    P: PositionSource,
    F: FragmentSource,
{
    let position = match source.current_position(max_position_age).await {
        Ok(position) => position,
        Err(err) => return FetchOutcome::Failure(err.into()),
    };

    debug!(
        lat = position.latitude,
        lon = position.longitude,
        "position acquired"
    );

    if !region.contains(position.latitude, position.longitude) {
        return FetchOutcome::Failure(RefreshError::OutOfRegion {
            latitude: position.latitude,
            longitude: position.longitude,
        });
    }

    fetcher.fetch_fragment(&position).await.into()
}
