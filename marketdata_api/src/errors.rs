//! Error types for the API client.

/// Errors that can occur when making API requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error, timeout, or unreadable body).
    #[error("Request failed")]
    RequestFailed,
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The API answered HTTP 429.
    #[error("Rate limited by chart API (HTTP 429)")]
    RateLimited,
    /// The chart payload carried an error object (unknown symbol, bad range, ...).
    #[error("Chart API error {code}: {description}")]
    Provider { code: String, description: String },
    /// The body was not a valid chart payload.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}
