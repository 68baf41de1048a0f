use std::{future::Future, path::PathBuf};

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use crate::{
    config,
    error::AuthError,
    management::TokenManager,
    types::{OAuthConfig, PendingAuthorization, Token},
    utils, warning,
};

/// The user-facing half of the authorization handshake.
///
/// Implementations show the authorization URL and hand back whatever URL the
/// browser was redirected to: typed into a terminal, captured by the local
/// callback listener, or pasted into the status window.
pub trait AuthPrompt {
    /// Presents `authorize_url` and waits for the redirected URL.
    fn redirected_url(
        &mut self,
        authorize_url: &str,
    ) -> impl Future<Output = Result<String, AuthError>> + Send;

    /// Called while the code is exchanged for a token.
    fn exchanging(&mut self) {}

    /// Called when the pasted URL or the exchange failed; the prompt is asked again.
    fn rejected(&mut self, error: &AuthError);

    /// Called once a token was obtained and saved.
    fn accepted(&mut self) {}
}

/// Obtains a usable credential, from the token cache or by asking the user.
///
/// The authorizer implements the OAuth 2.0 Authorization Code flow with PKCE
/// (Proof Key for Code Exchange). No client secret is involved: the code
/// verifier generated in [`begin`](Self::begin) proves to Spotify that the
/// same client that started the flow is completing it.
///
/// # Flow
///
/// 1. **Cache check**: a token in the cache is reused, refreshed if expired
/// 2. **PKCE setup**: a random verifier and its SHA256 challenge are generated
/// 3. **User authorization**: the user opens the authorize URL and grants access
/// 4. **Redirect**: Spotify redirects the browser to a URL carrying `code`
/// 5. **Token exchange**: code and verifier are exchanged for a token
/// 6. **Persistence**: the token is written to the cache for future runs
///
/// # Example
///
/// ```
/// let authorizer = Authorizer::from_env(config::token_cache_path());
/// let mut prompt = TerminalPrompt::new(false);
/// let tokens = authorizer.ensure_authorized(&mut prompt, false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Authorizer {
    oauth: OAuthConfig,
    token_path: PathBuf,
    client: Client,
}

impl Authorizer {
    pub fn new(oauth: OAuthConfig, token_path: PathBuf, client: Client) -> Self {
        Self {
            oauth,
            token_path,
            client,
        }
    }

    /// Builds an authorizer from the environment configuration.
    pub fn from_env(token_path: PathBuf) -> Self {
        Self::new(config::oauth_config(), token_path, Client::new())
    }

    pub fn token_path(&self) -> &PathBuf {
        &self.token_path
    }

    /// Returns the cached credential, refreshed when it has expired.
    ///
    /// `None` means the cache is missing, unreadable, or holds a refresh token
    /// Spotify rejects; the caller has to run the interactive flow. When the
    /// accounts service cannot be reached the expired credential is returned
    /// as is and the poll loop retries the refresh.
    pub async fn cached(&self) -> Option<TokenManager> {
        let mut manager = TokenManager::load(
            self.token_path.clone(),
            self.oauth.clone(),
            self.client.clone(),
        )
        .await
        .ok()?;

        match manager.get_valid_token().await {
            Ok(_) => Some(manager),
            Err(AuthError::Exchange(_)) => None,
            Err(AuthError::Store(e)) => {
                warning!("Refreshed the token but could not update the cache: {}", e);
                Some(manager)
            }
            Err(_) => Some(manager),
        }
    }

    /// Starts a handshake: a fresh PKCE verifier and its authorize URL.
    pub fn begin(&self) -> Result<PendingAuthorization, AuthError> {
        let code_verifier = utils::generate_code_verifier();
        let code_challenge = utils::generate_code_challenge(&code_verifier);
        let authorize_url = utils::build_authorize_url(&self.oauth, &code_challenge)?;

        Ok(PendingAuthorization {
            code_verifier,
            authorize_url,
        })
    }

    /// Completes a handshake with the URL the browser was redirected to.
    ///
    /// The token cache is only written after a successful exchange; a URL
    /// without a code leaves it untouched.
    pub async fn complete(
        &self,
        pending: &PendingAuthorization,
        redirected_url: &str,
    ) -> Result<TokenManager, AuthError> {
        let code = utils::parse_response_code(redirected_url)?;
        let token =
            exchange_code_pkce(&self.client, &self.oauth, &code, &pending.code_verifier).await?;

        let manager = TokenManager::new(
            token,
            self.token_path.clone(),
            self.oauth.clone(),
            self.client.clone(),
        );
        manager.persist().await.map_err(AuthError::Store)?;

        Ok(manager)
    }

    /// Returns a usable credential, prompting the user until one is obtained.
    ///
    /// With `force` the cached token is ignored. Parse and exchange failures
    /// are reported to the prompt and the user is asked again; only prompt I/O
    /// failures, cache write failures and configuration errors end the wait.
    pub async fn ensure_authorized<P: AuthPrompt>(
        &self,
        prompt: &mut P,
        force: bool,
    ) -> Result<TokenManager, AuthError> {
        if !force && let Some(manager) = self.cached().await {
            return Ok(manager);
        }

        let pending = self.begin()?;
        loop {
            let redirected_url = prompt.redirected_url(&pending.authorize_url).await?;
            prompt.exchanging();

            match self.complete(&pending, &redirected_url).await {
                Ok(manager) => {
                    prompt.accepted();
                    return Ok(manager);
                }
                Err(e) if e.is_retryable() => prompt.rejected(&e),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exchanges an authorization code for an access token using PKCE.
///
/// Completes the flow by posting the code together with the verifier that
/// was generated when the authorize URL was built. The verifier must match the
/// challenge sent in the authorize request, and codes are single-use and
/// expire after a few minutes.
///
/// # Errors
///
/// - [`AuthError::Exchange`] if Spotify refuses the code or the response
///   carries no access token
/// - [`AuthError::Unavailable`] if the token endpoint answers with a 5xx
/// - [`AuthError::Request`] on network failures
pub async fn exchange_code_pkce(
    client: &Client,
    oauth: &OAuthConfig,
    code: &str,
    verifier: &str,
) -> Result<Token, AuthError> {
    let res = client
        .post(&oauth.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", oauth.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", oauth.redirect_uri.as_str()),
        ])
        .send()
        .await?;

    let status = res.status();
    let json: Value = res.json().await.unwrap_or(Value::Null);
    check_token_response(&json, status)?;

    token_from_json(&json, None)
}

/// Refreshes an expired access token using its refresh token.
///
/// Spotify may or may not rotate the refresh token. When the response omits
/// it, the previous refresh token stays valid and is kept.
pub async fn refresh_token(
    client: &Client,
    oauth: &OAuthConfig,
    previous: &Token,
) -> Result<Token, AuthError> {
    let res = client
        .post(&oauth.token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", previous.refresh_token.as_str()),
            ("client_id", oauth.client_id.as_str()),
        ])
        .send()
        .await?;

    let status = res.status();
    let json: Value = res.json().await.unwrap_or(Value::Null);
    check_token_response(&json, status)?;

    token_from_json(&json, Some(previous))
}

fn token_from_json(json: &Value, previous: Option<&Token>) -> Result<Token, AuthError> {
    let access_token = json["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::Exchange("no access token in the response".to_string()))?;

    let refresh_token = json["refresh_token"]
        .as_str()
        .map(str::to_string)
        .or_else(|| previous.map(|p| p.refresh_token.clone()))
        .unwrap_or_default();

    let scope = json["scope"]
        .as_str()
        .map(str::to_string)
        .or_else(|| previous.map(|p| p.scope.clone()))
        .unwrap_or_default();

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token,
        scope,
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}

/// Server errors are transient; anything else means the grant was refused.
fn check_token_response(json: &Value, status: reqwest::StatusCode) -> Result<(), AuthError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(AuthError::Unavailable(describe_oauth_error(json, status)))
    } else {
        Err(AuthError::Exchange(describe_oauth_error(json, status)))
    }
}

fn describe_oauth_error(json: &Value, status: reqwest::StatusCode) -> String {
    match (json["error"].as_str(), json["error_description"].as_str()) {
        (Some(error), Some(description)) => format!("{} ({})", description, error),
        (Some(error), None) => error.to_string(),
        _ => format!("token endpoint answered {}", status),
    }
}
