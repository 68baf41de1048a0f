use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;

use crate::{
    error::AuthError,
    spotify,
    types::{OAuthConfig, Token},
};

/// Seconds before the real expiry at which a token counts as expired.
const EXPIRY_MARGIN_SECS: u64 = 240;

/// Owns the credential and its cache file.
#[derive(Debug, Clone)]
pub struct TokenManager {
    token: Token,
    path: PathBuf,
    oauth: OAuthConfig,
    client: Client,
}

impl TokenManager {
    pub fn new(token: Token, path: PathBuf, oauth: OAuthConfig, client: Client) -> Self {
        TokenManager {
            token,
            path,
            oauth,
            client,
        }
    }

    pub async fn load(path: PathBuf, oauth: OAuthConfig, client: Client) -> Result<Self, String> {
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self::new(token, path, oauth, client))
    }

    pub async fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    /// Returns an access token, refreshing and persisting it first if expired.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Exchange`] when Spotify rejects the refresh token; only
    ///   a new login helps
    /// - [`AuthError::Request`] when the accounts service cannot be reached
    /// - [`AuthError::Store`] when the refreshed token could not be written to
    ///   the cache. The refreshed token is kept in memory, so the next call
    ///   succeeds without another refresh.
    pub async fn get_valid_token(&mut self) -> Result<String, AuthError> {
        if self.is_expired() {
            self.token =
                spotify::auth::refresh_token(&self.client, &self.oauth, &self.token).await?;
            // Spotify may rotate the refresh token, an old cache would hold a dead one
            self.persist().await.map_err(AuthError::Store)?;
        }

        Ok(self.token.access_token.clone())
    }

    /// Forces a refresh on the next [`get_valid_token`](Self::get_valid_token).
    pub fn invalidate(&mut self) {
        self.token.obtained_at = 0;
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        let lifetime = self.token.expires_in.saturating_sub(EXPIRY_MARGIN_SECS);
        now >= self.token.obtained_at.saturating_add(lifetime)
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
