//! DriveMirror GDrive - Google Drive v3 remote store adapter
//!
//! Provides:
//! - A thin async client over the Drive v3 REST API
//! - The [`provider::DriveRemoteStore`] implementation of `IRemoteStore`
//! - Access token loading from a file or the environment
//!
//! ## Modules
//!
//! - [`client`] - HTTP client, query building, multipart uploads
//! - [`provider`] - `IRemoteStore` adapter over [`client::DriveClient`]
//! - [`token`] - Bearer token sources

pub mod client;
pub mod provider;
pub mod token;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// The access token is invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; the hint is reported, never acted upon
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("Unexpected status {status}: {body}")]
    Unexpected { status: u16, body: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No access token could be found
    #[error("Missing access token: {0}")]
    MissingToken(String),

    /// The configured API base URL is unusable
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Default retry-after duration when the header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

impl DriveError {
    /// Maps a non-success HTTP status to an error
    ///
    /// # Arguments
    /// * `status` - Response status
    /// * `body` - Response body, used as the error message
    /// * `retry_after` - Raw `Retry-After` header value, if any
    pub fn from_status(status: StatusCode, body: String, retry_after: Option<&str>) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized(body),
            StatusCode::FORBIDDEN => DriveError::Forbidden(body),
            StatusCode::NOT_FOUND => DriveError::NotFound(body),
            StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests {
                retry_after: retry_after
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER),
            },
            s if s.is_server_error() => DriveError::ServerError(format!("{}: {body}", s.as_u16())),
            s => DriveError::Unexpected {
                status: s.as_u16(),
                body,
            },
        }
    }
}

/// Parses a `Retry-After` value given in seconds or as an HTTP date
///
/// HTTP dates in the past or more than an hour ahead fall back to `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Some(secs) = (target - now)
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
