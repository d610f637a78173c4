use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single page request against the collection endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or timeout failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned {status} for page {page}")]
    Status { status: StatusCode, page: u32 },

    /// The body was not a JSON array of photos.
    #[error("malformed photo payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// No access key was configured or found in the environment.
    #[error("no access key configured")]
    MissingCredential,
}
