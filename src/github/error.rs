//! Error taxonomy for issue tracker requests.

use thiserror::Error;

/// Errors returned by [`IssueTracker`](super::IssueTracker) operations.
///
/// Each variant names the most likely misconfiguration so the message can be
/// shown to the user as-is.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// HTTP 401: the credential was missing or rejected.
    #[error("authentication failed (HTTP 401): check your auth token")]
    Authentication,

    /// HTTP 404: owner, repo or issue number does not exist.
    #[error("resource not found (HTTP 404): check your owner and repo")]
    NotFound,

    /// Any other non-success status, or a success with an empty body.
    #[error("request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    /// The base URL (or the owner/repo path built on it) is malformed.
    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The host could not be connected to.
    #[error("cannot reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// No response within the configured timeout.
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// A caller-supplied argument was rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TrackerError {
    /// HTTP status associated with this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrackerError::Authentication => Some(401),
            TrackerError::NotFound => Some(404),
            TrackerError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a transport-level `reqwest` failure.
    pub(crate) fn from_transport(err: &reqwest::Error, url: &str, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            TrackerError::Timeout {
                url: url.to_string(),
                seconds: timeout_seconds,
            }
        } else if err.is_builder() {
            TrackerError::InvalidEndpoint {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            TrackerError::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
