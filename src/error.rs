//! Error types for the authorization handshake and the polling loop.
//!
//! Authorization errors are user-correctable and lead to a new prompt. Poll
//! errors are always treated as transient: the loop backs off and retries.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The pasted redirect URL did not carry an authorization code.
    #[error("Could not read an authorization code: {0}. Copy the entire URL from the browser's address bar after granting access.")]
    Parse(String),

    /// Spotify rejected the code (expired, already used or issued for another verifier).
    #[error("Spotify rejected the authorization: {0}. Open the login URL again and paste the new redirect URL.")]
    Exchange(String),

    #[error("Could not reach Spotify: {0}")]
    Request(#[from] reqwest::Error),

    /// The accounts service answered with a server error.
    #[error("Spotify's accounts service is unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to save token to cache: {0}")]
    Store(String),

    #[error("Failed to read the redirect URL: {0}")]
    Input(#[from] std::io::Error),

    #[error("Invalid OAuth configuration: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether asking the user again can fix the error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Parse(_)
                | AuthError::Exchange(_)
                | AuthError::Request(_)
                | AuthError::Unavailable(_)
        )
    }
}

/// A failed poll iteration.
///
/// Every variant but [`PollError::Revoked`] is transient and retried after a
/// backoff. A revoked login cannot recover without the user.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Spotify answered {0}: {1}")]
    Status(StatusCode, String),

    #[error("access token was rejected")]
    Unauthorized,

    #[error("rate limited, retry after {}s", .0.as_secs())]
    RateLimited(Duration),

    #[error("unexpected playback response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("token refresh failed: {0}")]
    Token(String),

    /// Spotify rejected the refresh token.
    #[error("Spotify no longer accepts the saved login: {0}")]
    Revoked(String),

    #[error("failed to write status file: {0}")]
    Publish(#[from] std::io::Error),
}

impl From<AuthError> for PollError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Exchange(reason) => PollError::Revoked(reason),
            other => PollError::Token(other.to_string()),
        }
    }
}
