//! Adapter error types.

use thiserror::Error;

/// Errors returned by CRM client operations.
#[derive(Debug, Error)]
pub enum CrmError {
    /// The HTTP request could not be completed.
    #[error("CRM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The CRM answered with a non-success status.
    #[error("CRM returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected envelope shape.
    #[error("Malformed CRM response: {0}")]
    MalformedResponse(String),

    /// No access token could be obtained.
    #[error("CRM authentication failed: {0}")]
    Token(#[from] TokenError),

    /// A local file to upload could not be read.
    #[error("Attachment I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CRM rejected the request or an individual record.
    #[error("CRM rejected request: {0}")]
    Rejected(String),
}

/// Errors returned by access token providers.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token endpoint could not be reached.
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint refused the grant.
    #[error("Token grant rejected: {0}")]
    Rejected(String),
}

/// Errors returned when retrieving a file into scratch storage.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The download failed.
    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The file source answered with a non-success status.
    #[error("File source returned status {0}")]
    Status(u16),

    /// Writing to scratch storage failed.
    #[error("Scratch storage error: {0}")]
    Io(#[from] std::io::Error),

    /// The file source refused the request (used by the in-memory fetcher).
    #[error("File unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the notification channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request could not be completed.
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The channel API reported a failure.
    #[error("Notification rejected: {0}")]
    Rejected(String),
}
