//! Content refresh for a position.
//!
//! [`ContentFetcher`] asks the forecast server for the page at
//! `/@{lat},{lon}` and merges the anchored fragment into the view.

use crate::error::RefreshError;
use crate::position::Position;
use crate::view::ViewSurface;
use rainwatch_fetch::{FetchConfig, FetchError};
use std::future::Future;
use tracing::{debug, info};

/// Something that can produce the content fragment for a position.
///
/// The scheduler is generic over this so a tick can be driven without a
/// network; [`ContentFetcher`] is the production implementation.
pub trait FragmentSource: Send + Sync {
    /// Fetch the fragment HTML for `position`.
    fn fetch_fragment(
        &self,
        position: &Position,
    ) -> impl Future<Output = Result<String, RefreshError>> + Send;
}

impl<F: FragmentSource + ?Sized> FragmentSource for &F {
    fn fetch_fragment(
        &self,
        position: &Position,
    ) -> impl Future<Output = Result<String, RefreshError>> + Send {
        (**self).fetch_fragment(position)
    }
}

/// Fetches forecast fragments over HTTP.
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ContentFetcher {
    /// Build a fetcher for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] for an invalid config and
    /// [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        config.validate()?;
        let client = rainwatch_fetch::build_client(&config)?;
        Ok(Self { client, config })
    }

    /// Request path for `position`, e.g. `/@52.363137,4.889856`.
    pub fn request_path(position: &Position) -> String {
        rainwatch_fetch::coords_path(position.latitude, position.longitude)
    }

    /// Fetch the fragment for `position` and replace the view's content with it.
    ///
    /// The view is only touched on success. The scheduler does not call
    /// this: it fetches through [`FragmentSource`] and merges the fragment
    /// itself, after checking the outcome is not stale.
    ///
    /// # Errors
    ///
    /// [`RefreshError::Remote`] on non-2xx, [`RefreshError::Structural`] when
    /// the anchor is missing, [`RefreshError::Network`] on transport failure.
    pub async fn refresh<V: ViewSurface>(
        &self,
        position: &Position,
        view: &V,
    ) -> Result<(), RefreshError> {
        let fragment = self.fetch_fragment(position).await?;
        view.set_content(&fragment);
        Ok(())
    }
}

impl FragmentSource for ContentFetcher {
    async fn fetch_fragment(&self, position: &Position) -> Result<String, RefreshError> {
        debug!(
            path = %Self::request_path(position),
            "fetching forecast fragment"
        );
        let fragment = rainwatch_fetch::fetch_fragment(
            &self.client,
            &self.config,
            position.latitude,
            position.longitude,
        )
        .await?;
        info!(bytes = fragment.len(), "forecast fragment received");
        Ok(fragment)
    }
}
