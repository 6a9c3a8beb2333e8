//! Error types for the rainwatch-fetch crate.
//!
//! Messages are stable lower-case strings. The scheduler surfaces them to the
//! viewer verbatim, so they never contain request bodies.

/// Errors that can occur while fetching a forecast fragment.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a non-2xx status.
    #[error("remote error: server responded with status {status}")]
    Remote {
        /// HTTP status code returned by the endpoint.
        status: u16,
    },

    /// The response parsed, but the content anchor was not in it.
    #[error("structural error: response has no element with id \"{anchor}\"")]
    Structural {
        /// Element id that was looked up.
        anchor: String,
    },

    /// Invalid fetch configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for rainwatch-fetch results.
pub type Result<T> = std::result::Result<T, FetchError>;
