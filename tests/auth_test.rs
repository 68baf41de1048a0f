use std::{collections::HashMap, collections::VecDeque, net::SocketAddr, path::Path, time::Duration};

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use reqwest::Client;
use serde_json::{Value, json};
use tempfile::tempdir;
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use vodsync::api::CallbackState;
use vodsync::error::{AuthError, PollError};
use vodsync::management::{StatusPublisher, TokenManager};
use vodsync::server::start_api_server;
use vodsync::spotify::auth::{AuthPrompt, Authorizer, exchange_code_pkce};
use vodsync::spotify::playback::{PlaybackSource, SpotifyPlayback};
use vodsync::types::{OAuthConfig, Token};
use vodsync::watcher::{LoopExit, PollLoop, PollSettings, StopSignal, WatchEvent};

fn field<'a>(form: &'a HashMap<String, String>, name: &str) -> &'a str {
    form.get(name).map(String::as_str).unwrap_or_default()
}

async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    if field(&form, "client_id") != "client" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_client"})),
        );
    }

    match field(&form, "grant_type") {
        "authorization_code" if field(&form, "code") == "good" && !field(&form, "code_verifier").is_empty() => (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "scope": "user-read-playback-state",
                "expires_in": 3600,
                "refresh_token": "refresh-1"
            })),
        ),
        "authorization_code" => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })),
        ),
        // no refresh_token in the answer: the old one stays valid
        "refresh_token" if field(&form, "refresh_token") == "refresh-1" => (
            StatusCode::OK,
            Json(json!({"access_token": "access-2", "expires_in": 3600})),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        ),
    }
}

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn player_ok(headers: HeaderMap) -> impl IntoResponse {
    if bearer(&headers) != "Bearer access-1" {
        return (StatusCode::UNAUTHORIZED, Json(Value::Null));
    }
    (
        StatusCode::OK,
        Json(json!({
            "is_playing": true,
            "progress_ms": 1234,
            "item": {
                "id": "track1",
                "name": "Song",
                "duration_ms": 200000,
                "artists": [{"name": "A"}, {"name": "B"}]
            }
        })),
    )
}

async fn player_idle() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn player_unauthorized() -> StatusCode {
    StatusCode::UNAUTHORIZED
}

async fn player_limited() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "42")])
}

async fn player_broken() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "upstream down")
}

async fn token_unavailable() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "server_error"})),
    )
}

/// Fake accounts and Web API endpoints on an ephemeral port.
async fn fake_spotify() -> SocketAddr {
    let app = Router::new()
        .route("/api/token", post(token_endpoint))
        .route("/ok/me/player", get(player_ok))
        .route("/idle/me/player", get(player_idle))
        .route("/unauthorized/me/player", get(player_unauthorized))
        .route("/limited/me/player", get(player_limited))
        .route("/broken/me/player", get(player_broken))
        .route("/down/api/token", post(token_unavailable));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn oauth(addr: SocketAddr) -> OAuthConfig {
    OAuthConfig {
        client_id: "client".to_string(),
        redirect_uri: "https://www.google.com".to_string(),
        scope: "user-read-playback-state".to_string(),
        auth_url: format!("http://{}/authorize", addr),
        token_url: format!("http://{}/api/token", addr),
    }
}

fn fresh_token(access_token: &str) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: "refresh-1".to_string(),
        scope: "user-read-playback-state".to_string(),
        expires_in: 3600,
        obtained_at: chrono::Utc::now().timestamp() as u64,
    }
}

fn read_token(path: &Path) -> Token {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Answers with a fixed list of redirect URLs and records the callbacks.
struct ScriptedPrompt {
    answers: VecDeque<String>,
    shown_urls: Vec<String>,
    rejections: Vec<String>,
    accepted: bool,
}

impl ScriptedPrompt {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            shown_urls: Vec::new(),
            rejections: Vec::new(),
            accepted: false,
        }
    }
}

impl AuthPrompt for ScriptedPrompt {
    async fn redirected_url(&mut self, authorize_url: &str) -> Result<String, AuthError> {
        self.shown_urls.push(authorize_url.to_string());
        self.answers.pop_front().ok_or_else(|| {
            AuthError::Input(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no more answers",
            ))
        })
    }

    fn rejected(&mut self, error: &AuthError) {
        self.rejections.push(error.to_string());
    }

    fn accepted(&mut self) {
        self.accepted = true;
    }
}

#[tokio::test]
async fn test_exchange_code_pkce() {
    let addr = fake_spotify().await;
    let token = exchange_code_pkce(&Client::new(), &oauth(addr), "good", "verifier")
        .await
        .unwrap();

    assert_eq!(token.access_token, "access-1");
    assert_eq!(token.refresh_token, "refresh-1");
    assert_eq!(token.expires_in, 3600);
    assert!(token.obtained_at > 0);
}

#[tokio::test]
async fn test_exchange_rejected_code() {
    let addr = fake_spotify().await;
    let result = exchange_code_pkce(&Client::new(), &oauth(addr), "expired", "verifier").await;

    match result {
        Err(AuthError::Exchange(message)) => {
            assert!(message.contains("Invalid authorization code"))
        }
        other => panic!("expected an exchange error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_complete_persists_token() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache").join("token.json");
    let authorizer = Authorizer::new(oauth(addr), path.clone(), Client::new());

    let pending = authorizer.begin().unwrap();
    assert!(pending.authorize_url.contains("code_challenge_method=S256"));

    let tokens = authorizer
        .complete(&pending, "https://www.google.com/?code=good")
        .await
        .unwrap();

    assert_eq!(tokens.current_token().access_token, "access-1");
    assert_eq!(read_token(&path).access_token, "access-1");
}

#[tokio::test]
async fn test_complete_with_bad_url_keeps_existing_cache() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, "existing").unwrap();
    let authorizer = Authorizer::new(oauth(addr), path.clone(), Client::new());
    let pending = authorizer.begin().unwrap();

    let result = authorizer.complete(&pending, "not a url").await;
    assert!(matches!(result, Err(AuthError::Parse(_))));

    let result = authorizer
        .complete(&pending, "https://www.google.com/?code=expired")
        .await;
    assert!(matches!(result, Err(AuthError::Exchange(_))));

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing");
}

#[tokio::test]
async fn test_ensure_authorized_retries_until_success() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("token.json");
    let authorizer = Authorizer::new(oauth(addr), path.clone(), Client::new());

    let mut prompt = ScriptedPrompt::new(&[
        "https://www.google.com/?state=nothing",
        "https://www.google.com/?code=expired",
        "https://www.google.com/?code=good",
    ]);
    let tokens = authorizer.ensure_authorized(&mut prompt, false).await.unwrap();

    assert_eq!(tokens.current_token().access_token, "access-1");
    assert_eq!(prompt.rejections.len(), 2);
    assert!(prompt.accepted);
    assert!(path.is_file());

    // every attempt belongs to the same handshake
    assert_eq!(prompt.shown_urls.len(), 3);
    assert!(prompt.shown_urls.iter().all(|u| *u == prompt.shown_urls[0]));
}

#[tokio::test]
async fn test_ensure_authorized_uses_cache() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, serde_json::to_string(&fresh_token("cached")).unwrap()).unwrap();
    let authorizer = Authorizer::new(oauth(addr), path.clone(), Client::new());

    let mut prompt = ScriptedPrompt::new(&[]);
    let tokens = authorizer.ensure_authorized(&mut prompt, false).await.unwrap();
    assert_eq!(tokens.current_token().access_token, "cached");
    assert!(prompt.shown_urls.is_empty());

    // forcing ignores the cache and asks
    let mut prompt = ScriptedPrompt::new(&["https://www.google.com/?code=good"]);
    let tokens = authorizer.ensure_authorized(&mut prompt, true).await.unwrap();
    assert_eq!(tokens.current_token().access_token, "access-1");
    assert_eq!(prompt.shown_urls.len(), 1);
}

#[tokio::test]
async fn test_ensure_authorized_stops_on_input_failure() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let authorizer = Authorizer::new(oauth(addr), dir.path().join("token.json"), Client::new());

    let mut prompt = ScriptedPrompt::new(&[]);
    let result = authorizer.ensure_authorized(&mut prompt, false).await;
    assert!(matches!(result, Err(AuthError::Input(_))));
}

#[tokio::test]
async fn test_refresh_keeps_previous_refresh_token() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("token.json");

    let mut expired = fresh_token("access-1");
    expired.obtained_at = 0;
    let mut manager = TokenManager::new(expired, path.clone(), oauth(addr), Client::new());
    assert!(manager.is_expired());

    let access = manager.get_valid_token().await.unwrap();

    assert_eq!(access, "access-2");
    assert_eq!(manager.current_token().refresh_token, "refresh-1");
    assert!(!manager.is_expired());
    assert_eq!(read_token(&path).access_token, "access-2");
}

#[tokio::test]
async fn test_cached_refreshes_expired_token() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("token.json");
    let mut expired = fresh_token("access-1");
    expired.obtained_at = 0;
    std::fs::write(&path, serde_json::to_string(&expired).unwrap()).unwrap();

    let authorizer = Authorizer::new(oauth(addr), path.clone(), Client::new());
    let tokens = authorizer.cached().await.unwrap();
    assert_eq!(tokens.current_token().access_token, "access-2");
}

#[tokio::test]
async fn test_cached_with_unusable_cache() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("token.json");
    let authorizer = Authorizer::new(oauth(addr), path.clone(), Client::new());

    assert!(authorizer.cached().await.is_none());

    std::fs::write(&path, "{ not json").unwrap();
    assert!(authorizer.cached().await.is_none());

    // expired and the refresh token is no longer accepted
    let mut revoked = fresh_token("access-1");
    revoked.obtained_at = 0;
    revoked.refresh_token = "revoked".to_string();
    std::fs::write(&path, serde_json::to_string(&revoked).unwrap()).unwrap();
    assert!(authorizer.cached().await.is_none());
}

fn playback_source(addr: SocketAddr, prefix: &str, dir: &Path) -> SpotifyPlayback {
    let manager = TokenManager::new(
        fresh_token("access-1"),
        dir.join("token.json"),
        oauth(addr),
        Client::new(),
    );
    playback_source_with(addr, prefix, manager)
}

fn playback_source_with(addr: SocketAddr, prefix: &str, tokens: TokenManager) -> SpotifyPlayback {
    SpotifyPlayback::new(format!("http://{}/{}", addr, prefix), tokens)
}

#[tokio::test]
async fn test_current_playback() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let mut source = playback_source(addr, "ok", dir.path());

    let playback = source.current_playback().await.unwrap().unwrap();
    assert!(playback.is_playing);
    assert_eq!(playback.progress_ms, Some(1234));

    let item = playback.item.unwrap();
    assert_eq!(item.name.as_deref(), Some("Song"));
    assert_eq!(item.artists.len(), 2);
}

#[tokio::test]
async fn test_current_playback_nothing_active() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let mut source = playback_source(addr, "idle", dir.path());

    assert!(source.current_playback().await.unwrap().is_none());
}

#[tokio::test]
async fn test_current_playback_unauthorized_invalidates_token() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let mut source = playback_source(addr, "unauthorized", dir.path());

    let result = source.current_playback().await;
    assert!(matches!(result, Err(PollError::Unauthorized)));
    assert!(source.tokens().is_expired());
}

#[tokio::test]
async fn test_current_playback_rate_limited() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let mut source = playback_source(addr, "limited", dir.path());

    match source.current_playback().await {
        Err(PollError::RateLimited(retry_after)) => {
            assert_eq!(retry_after, Duration::from_secs(42))
        }
        other => panic!("expected rate limiting, got {:?}", other),
    }
}

#[tokio::test]
async fn test_current_playback_server_error() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let mut source = playback_source(addr, "broken", dir.path());

    match source.current_playback().await {
        Err(PollError::Status(status, body)) => {
            assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
            assert_eq!(body, "upstream down");
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_callback_listener_forwards_redirect() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let state = CallbackState {
        redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
        redirects: tx,
    };
    let (addr, server) = start_api_server("127.0.0.1:0", state).await.unwrap();
    let client = Client::new();

    let health: Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["awaiting_login"], true);

    let response = client
        .get(format!("http://{}/callback?code=abc&state=xyz", addr))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let forwarded = rx.recv().await.unwrap();
    assert_eq!(forwarded, "http://127.0.0.1:8888/callback?code=abc&state=xyz");
    assert_eq!(
        vodsync::utils::parse_response_code(&forwarded).unwrap(),
        "abc"
    );

    server.abort();
}

#[tokio::test]
async fn test_callback_listener_rejects_bad_address() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let state = CallbackState {
        redirect_uri: "http://localhost/callback".to_string(),
        redirects: tx,
    };
    let result = start_api_server("not-an-address", state).await;
    assert!(matches!(result, Err(e) if e.kind() == std::io::ErrorKind::InvalidInput));
}

/// An address nothing listens on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn expired_token(refresh_token: &str) -> Token {
    let mut token = fresh_token("access-1");
    token.obtained_at = 0;
    token.refresh_token = refresh_token.to_string();
    token
}

#[tokio::test]
async fn test_revoked_login_ends_poll_loop() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let manager = TokenManager::new(
        {
            let mut token = fresh_token("access-1");
            token.refresh_token = "revoked".to_string();
            token
        },
        dir.path().join("token.json"),
        oauth(addr),
        Client::new(),
    );
    let mut source = SpotifyPlayback::new(format!("http://{}/unauthorized", addr), manager);

    let settings = PollSettings {
        interval: Duration::from_millis(5),
        error_backoff: Duration::from_millis(10),
        ..PollSettings::default()
    };
    let stop = StopSignal::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poll_loop = PollLoop::new(
        StatusPublisher::new(dir.path().join("status.json")),
        settings,
        stop.clone(),
    )
    .with_events(tx);

    // 401 invalidates the token, the refresh is then refused
    let exit = timeout(Duration::from_secs(5), poll_loop.run(&mut source))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::ReauthorizationRequired);
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.last(), Some(&WatchEvent::ReauthorizationRequired));
}

#[tokio::test]
async fn test_refused_refresh_is_revoked() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let manager = TokenManager::new(
        expired_token("revoked"),
        dir.path().join("token.json"),
        oauth(addr),
        Client::new(),
    );
    let mut source = playback_source_with(addr, "ok", manager);

    let result = source.current_playback().await;
    assert!(matches!(result, Err(PollError::Revoked(_))));
}

#[tokio::test]
async fn test_unreachable_accounts_service_is_transient() {
    let closed = closed_addr().await;
    let dir = tempdir().unwrap();
    let manager = TokenManager::new(
        expired_token("refresh-1"),
        dir.path().join("token.json"),
        oauth(closed),
        Client::new(),
    );
    let mut source = SpotifyPlayback::new(format!("http://{}", closed), manager);

    let result = source.current_playback().await;
    assert!(matches!(result, Err(PollError::Token(_))));
}

#[tokio::test]
async fn test_token_endpoint_server_error_is_transient() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let mut down = oauth(addr);
    down.token_url = format!("http://{}/down/api/token", addr);
    let mut manager = TokenManager::new(
        expired_token("refresh-1"),
        dir.path().join("token.json"),
        down,
        Client::new(),
    );

    let result = manager.get_valid_token().await;
    assert!(matches!(result, Err(AuthError::Unavailable(_))));
    assert!(matches!(
        PollError::from(result.unwrap_err()),
        PollError::Token(_)
    ));
}

#[tokio::test]
async fn test_cached_keeps_token_when_offline() {
    let closed = closed_addr().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, serde_json::to_string(&expired_token("refresh-1")).unwrap()).unwrap();

    let authorizer = Authorizer::new(oauth(closed), path.clone(), Client::new());
    let tokens = authorizer.cached().await.unwrap();

    // the refresh is retried by the poll loop
    assert!(tokens.is_expired());
    assert_eq!(tokens.current_token().refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_refresh_reports_failed_cache_write() {
    let addr = fake_spotify().await;
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let mut manager = TokenManager::new(
        expired_token("refresh-1"),
        blocker.join("token.json"),
        oauth(addr),
        Client::new(),
    );

    let result = manager.get_valid_token().await;
    assert!(matches!(result, Err(AuthError::Store(_))));

    // the refreshed token is kept, no second refresh needed
    assert_eq!(manager.current_token().access_token, "access-2");
    assert_eq!(manager.get_valid_token().await.unwrap(), "access-2");
}

#[tokio::test]
async fn test_callback_listener_keeps_redirect_query() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let state = CallbackState {
        redirect_uri: "http://127.0.0.1:8888/callback?source=vodsync".to_string(),
        redirects: tx,
    };
    let (addr, server) = start_api_server("127.0.0.1:0", state).await.unwrap();

    Client::new()
        .get(format!("http://{}/callback?code=abc", addr))
        .send()
        .await
        .unwrap();

    let forwarded = rx.recv().await.unwrap();
    assert_eq!(
        forwarded,
        "http://127.0.0.1:8888/callback?source=vodsync&code=abc"
    );
    assert_eq!(
        vodsync::utils::parse_response_code(&forwarded).unwrap(),
        "abc"
    );

    server.abort();
}
