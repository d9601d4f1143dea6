//! Shared types used by the object store client.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned while interacting with the object store.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid object store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The store responded with an unexpected status code.
    #[error("Unexpected object store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}
