use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use url::Url;

use crate::{
    error::AuthError,
    types::{ItemArtist, OAuthConfig},
};

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Builds the Spotify authorization URL for a PKCE code challenge.
pub fn build_authorize_url(oauth: &OAuthConfig, code_challenge: &str) -> Result<String, AuthError> {
    let url = Url::parse_with_params(
        &oauth.auth_url,
        &[
            ("client_id", oauth.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", oauth.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", oauth.scope.as_str()),
        ],
    )
    .map_err(|e| AuthError::Config(format!("invalid authorize URL: {}", e)))?;

    Ok(url.to_string())
}

/// Extracts the authorization code from the URL the browser was redirected to.
pub fn parse_response_code(redirected_url: &str) -> Result<String, AuthError> {
    let input = redirected_url.trim();
    if input.is_empty() {
        return Err(AuthError::Parse("nothing was pasted".to_string()));
    }

    let url = Url::parse(input).map_err(|e| AuthError::Parse(format!("not a URL ({})", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(AuthError::Parse(format!(
                    "Spotify redirected with error `{}`",
                    value
                )));
            }
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| AuthError::Parse("the URL has no `code` parameter".to_string()))
}

/// Joins artist names with `", "`; artists without a name render as `Unknown`.
pub fn join_artist_names(artists: &[ItemArtist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_deref().unwrap_or("Unknown"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats milliseconds as `m:ss`.
pub fn format_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
