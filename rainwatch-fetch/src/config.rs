//! Endpoint configuration with sensible defaults.
//!
//! [`FetchConfig`] says where the forecast server lives, how long a request
//! may take, and which element id anchors the refreshable fragment.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};

/// Default base URL of the forecast server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:42069";

/// Default id of the element whose contents are refreshed.
pub const DEFAULT_ANCHOR_ID: &str = "content";

/// Configuration for fetching forecast fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Scheme, host and port of the forecast server. Any path is replaced by
    /// the coordinate path.
    pub base_url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, `rainwatch-fetch/<version>` is sent.
    pub user_agent: Option<String>,
    /// Element id of the content anchor in both the response and the view.
    pub anchor_id: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_seconds: 10,
            user_agent: None,
            anchor_id: DEFAULT_ANCHOR_ID.to_owned(),
        }
    }
}

impl FetchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `base_url` must be an absolute `http` or `https` URL
    /// - `timeout_seconds` must be greater than 0
    /// - `anchor_id` must not be empty or contain quotes
    pub fn validate(&self) -> Result<(), FetchError> {
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| FetchError::Config(format!("base_url is not a valid URL: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(FetchError::Config(format!(
                "base_url scheme must be http or https, got {}",
                base.scheme()
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(FetchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.anchor_id.trim().is_empty() {
            return Err(FetchError::Config("anchor_id must not be empty".into()));
        }
        if self.anchor_id.contains('"') {
            return Err(FetchError::Config(
                "anchor_id must not contain quotes".into(),
            ));
        }
        Ok(())
    }
}
