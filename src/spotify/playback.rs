use std::{future::Future, time::Duration};

use reqwest::{Client, StatusCode, header::RETRY_AFTER};

use crate::{error::PollError, management::TokenManager, types::CurrentPlayback};

/// Retry delay assumed when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Anything that can report the current playback state.
pub trait PlaybackSource {
    /// `Ok(None)` means nothing is active on any of the user's devices.
    fn current_playback(
        &mut self,
    ) -> impl Future<Output = Result<Option<CurrentPlayback>, PollError>> + Send;
}

/// Reads the playback state from the Spotify Web API.
pub struct SpotifyPlayback {
    api_url: String,
    client: Client,
    tokens: TokenManager,
}

impl SpotifyPlayback {
    pub fn new(api_url: String, tokens: TokenManager) -> Self {
        let client = tokens.client().clone();
        Self {
            api_url,
            client,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }
}

impl PlaybackSource for SpotifyPlayback {
    /// Retrieves the user's current playback from `GET /me/player`.
    ///
    /// The access token is refreshed first when it is about to expire. A
    /// rejected refresh is reported as [`PollError::Revoked`]. A 401
    /// invalidates the token so the next call refreshes it, and is reported
    /// as [`PollError::Unauthorized`] so the caller can count them.
    async fn current_playback(&mut self) -> Result<Option<CurrentPlayback>, PollError> {
        let token = self.tokens.get_valid_token().await?;

        let api_url = format!("{uri}/me/player", uri = self.api_url);
        let response = self.client.get(&api_url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::UNAUTHORIZED => {
                self.tokens.invalidate();
                Err(PollError::Unauthorized)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RETRY_AFTER);
                Err(PollError::RateLimited(retry_after))
            }
            status if status.is_success() => {
                let body = response.text().await?;
                if body.trim().is_empty() {
                    return Ok(None);
                }
                let playback = serde_json::from_str::<CurrentPlayback>(&body)?;
                Ok(Some(playback))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(PollError::Status(status, body))
            }
        }
    }
}
