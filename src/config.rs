//! Configuration management for the VOD Sync watcher.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. Every value has a default that matches the public
//! VOD Sync Spotify application, so a fresh install works without any setup.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Command-line flags (highest priority, applied by the CLI layer)
//! 2. Environment variables
//! 3. `.env` file in the local data directory
//! 4. Application defaults

use std::{env, path::PathBuf};

use crate::types::OAuthConfig;

const DEFAULT_CLIENT_ID: &str = "75c3f7c5e078465496bbc13564521bc7";
const DEFAULT_REDIRECT_URI: &str = "https://www.google.com";
const DEFAULT_SCOPE: &str = "user-read-playback-state";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

/// File name of the published status inside the temporary directory.
pub const STATUS_FILE_NAME: &str = "vod_sync_data.json";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from `vodsync/.env` below the platform-specific local
/// data directory:
///
/// - Linux: `~/.local/share/vodsync/.env`
/// - macOS: `~/Library/Application Support/vodsync/.env`
/// - Windows: `%LOCALAPPDATA%/vodsync/.env`
///
/// A missing `.env` file is not an error, every setting has a default.
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| e.to_string())
}

/// Root of everything vodsync keeps between runs.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("vodsync");
    path
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Returns the address for the local OAuth callback listener.
///
/// Reads `SERVER_ADDRESS`, e.g. `127.0.0.1:8888`. The redirect URI registered
/// with Spotify has to point at this address for `--listen` to receive the
/// callback.
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

pub fn spotify_client_id() -> String {
    var_or("SPOTIFY_API_AUTH_CLIENT_ID", DEFAULT_CLIENT_ID)
}

/// Returns the Spotify OAuth redirect URI.
///
/// Must match a redirect URI registered in the Spotify application settings.
/// The default sends the browser to a public page so the user can copy the
/// address bar, which contains the authorization code.
pub fn spotify_redirect_uri() -> String {
    var_or("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

pub fn spotify_scope() -> String {
    var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE)
}

pub fn spotify_apiauth_url() -> String {
    var_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL)
}

pub fn spotify_apiurl() -> String {
    var_or("SPOTIFY_API_URL", DEFAULT_API_URL)
}

pub fn spotify_apitoken_url() -> String {
    var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Returns the path of the published status file.
///
/// Reads `VODSYNC_STATUS_FILE`, falling back to `vod_sync_data.json` in the
/// system temporary directory, which is where the consumer looks for it.
pub fn status_file() -> PathBuf {
    match env::var("VODSYNC_STATUS_FILE") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => env::temp_dir().join(STATUS_FILE_NAME),
    }
}

/// Returns the path of the token cache.
///
/// Reads `VODSYNC_TOKEN_CACHE`, falling back to `cache/token.json` inside
/// [`data_dir`].
pub fn token_cache_path() -> PathBuf {
    match env::var("VODSYNC_TOKEN_CACHE") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => data_dir().join("cache").join("token.json"),
    }
}

/// Collects the OAuth settings from the environment into one value.
pub fn oauth_config() -> OAuthConfig {
    OAuthConfig {
        client_id: spotify_client_id(),
        redirect_uri: spotify_redirect_uri(),
        scope: spotify_scope(),
        auth_url: spotify_apiauth_url(),
        token_url: spotify_apitoken_url(),
    }
}
