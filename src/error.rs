//! Error types for media-dl
//!
//! Every failure is terminal for the unit of work it occurred in — there are
//! no automatic retries. Errors surface at the granularity of one asset, one
//! post, or one identity, never crashing a whole batch run.

use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// I/O error (directory listing/creation, file writes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (asset fetch, gallery/album lookup, listing feed)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error (config file, album listing response)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested identity does not exist on the source platform
    ///
    /// Distinguishable from transient network failures so callers can clean
    /// up an empty target directory instead of retrying.
    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    /// URL resolution failed (malformed gallery page, album listing, etc.)
    #[error("resolve error: {0}")]
    Resolve(String),

    /// Source adapter failure that is not an identity-not-found condition
    #[error("source error: {0}")]
    Source(String),

    /// Provenance metadata could not be written into an image file
    ///
    /// Always non-fatal to the pipeline — the media file on disk stays valid.
    #[error("provenance error: {0}")]
    Provenance(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the identity does not exist on the platform
    #[must_use]
    pub fn is_identity_not_found(&self) -> bool {
        matches!(self, Error::IdentityNotFound(_))
    }
}
