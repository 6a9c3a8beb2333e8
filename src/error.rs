//! Error types for rainwatch.
//!
//! [`RefreshError`] is the per-tick taxonomy: every variant is shown to the
//! viewer and ends the automatic refresh loop until the next visibility
//! change. [`WatchError`] covers setup (config, I/O) and is returned to the
//! binary.

use rainwatch_fetch::FetchError;

/// Failure to obtain a device position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    /// The platform refused access to the location.
    #[error("location permission denied: {0}")]
    PermissionDenied(String),

    /// No fix arrived within the allotted time.
    #[error("location request timed out")]
    Timeout,

    /// The platform could not determine a position.
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Everything that can end a single refresh tick.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The position query failed.
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    /// A valid position outside the supported bounding box.
    #[error("location outside supported region (The Netherlands)")]
    OutOfRegion {
        /// Latitude that was rejected.
        latitude: f64,
        /// Longitude that was rejected.
        longitude: f64,
    },

    /// The forecast endpoint answered with a non-2xx status.
    #[error("forecast server responded with status {status}")]
    Remote {
        /// HTTP status code.
        status: u16,
    },

    /// The forecast response lacked the content anchor.
    #[error("forecast response has no element with id \"{anchor}\"")]
    Structural {
        /// Element id that was looked up.
        anchor: String,
    },

    /// Transport-level failure talking to the endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// The fetch client was set up with an unusable endpoint.
    #[error("forecast client misconfigured: {0}")]
    Config(String),
}

impl From<FetchError> for RefreshError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Remote { status } => Self::Remote { status },
            FetchError::Structural { anchor } => Self::Structural { anchor },
            FetchError::Http(msg) => Self::Network(msg),
            FetchError::Config(msg) => Self::Config(msg),
        }
    }
}

/// Setup-time errors surfaced to the binary.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetch client setup error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A one-shot refresh or locate failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WatchError>;
