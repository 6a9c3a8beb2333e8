//! # rainwatch-fetch
//!
//! Fetches the forecast fragment for a coordinate pair.
//!
//! The forecast server renders a page per location at `/@{lat},{lon}`.
//! This crate builds that path, issues the GET, and pulls the fragment
//! anchored at a well-known element id out of the response.
//!
//! ## Failure modes
//!
//! - Non-2xx responses become [`FetchError::Remote`] and are not retried
//! - A response without the anchor becomes [`FetchError::Structural`]
//! - Transport failures become [`FetchError::Http`]

pub mod config;
pub mod error;
pub mod fragment;
pub mod http;

pub use config::FetchConfig;
pub use error::{FetchError, Result};
pub use fragment::{extract_fragment, fragment_text};
pub use http::build_client;

use tracing::debug;

/// Build the request path for a coordinate pair.
///
/// Coordinates use Rust's shortest round-trip float formatting, so the value
/// is never rounded: `52.0` becomes `52`, `4.889856` stays `4.889856`.
///
/// # Examples
///
/// ```
/// assert_eq!(rainwatch_fetch::coords_path(52.363137, 4.889856), "/@52.363137,4.889856");
/// assert_eq!(rainwatch_fetch::coords_path(52.0, 5.0), "/@52,5");
/// ```
pub fn coords_path(lat: f64, lon: f64) -> String {
    format!("/@{lat},{lon}")
}

/// Resolve the full request URL for a coordinate pair against `config.base_url`.
///
/// # Errors
///
/// Returns [`FetchError::Config`] if the base URL does not parse.
pub fn request_url(config: &FetchConfig, lat: f64, lon: f64) -> Result<url::Url> {
    let base = url::Url::parse(&config.base_url)
        .map_err(|e| FetchError::Config(format!("base_url is not a valid URL: {e}")))?;
    base.join(&coords_path(lat, lon))
        .map_err(|e| FetchError::Config(format!("cannot build request URL: {e}")))
}

/// Fetch the forecast page for `(lat, lon)` and return the anchored fragment.
///
/// # Errors
///
/// Returns [`FetchError::Remote`] for non-2xx statuses,
/// [`FetchError::Structural`] when the anchor is missing, and
/// [`FetchError::Http`] when the request or body read fails.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> rainwatch_fetch::Result<()> {
/// let config = rainwatch_fetch::FetchConfig::default();
/// let client = rainwatch_fetch::build_client(&config)?;
/// let html = rainwatch_fetch::fetch_fragment(&client, &config, 52.0, 5.0).await?;
/// println!("{html}");
/// # Ok(())
/// # }
/// ```
pub async fn fetch_fragment(
    client: &reqwest::Client,
    config: &FetchConfig,
    lat: f64,
    lon: f64,
) -> Result<String> {
    let url = request_url(config, lat, lon)?;
    debug!(%url, "requesting forecast fragment");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Http(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), "forecast endpoint returned failure");
        return Err(FetchError::Remote {
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Http(format!("cannot read response body: {e}")))?;

    extract_fragment(&body, &config.anchor_id)
}
