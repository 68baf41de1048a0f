//! # Spotify Integration Module
//!
//! This module is the integration layer between the watcher and Spotify's
//! services. It handles the OAuth handshake, token exchange and refresh, and
//! the playback query the polling loop runs.
//!
//! ## Architecture
//!
//! ```text
//! Application Layer (CLI, status window, poll loop)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authorization (OAuth 2.0 PKCE)
//!     └── Playback (current playback state)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API / Accounts service
//! ```
//!
//! ## Core Modules
//!
//! ### Authorization Module
//!
//! [`auth`] - Implements the OAuth 2.0 PKCE flow:
//! - **Authorizer**: reuses the cached token or runs the interactive handshake
//! - **Prompts**: the [`auth::AuthPrompt`] trait decouples the handshake from
//!   the way the redirect URL is collected (terminal, callback listener, window)
//! - **Token Exchange**: exchanges authorization codes and refresh tokens
//!
//! ### Playback Module
//!
//! [`playback`] - Reads `GET /me/player`:
//! - **No Content**: a 204 means nothing is playing and maps to `None`
//! - **Expired Tokens**: a 401 invalidates the token so the next poll refreshes it
//! - **Rate Limiting**: a 429 reports the `Retry-After` delay to the poll loop
//!
//! ## API Coverage
//!
//! - `GET /authorize` - User authorization (opened in the browser)
//! - `POST /api/token` - Code exchange and token refresh
//! - `GET /me/player` - Current playback state
//!
//! ## Error Types
//!
//! - **[`crate::error::AuthError`]** - handshake failures, most of them user-correctable
//! - **[`crate::error::PollError`]** - transient failures of a single poll

pub mod auth;
pub mod playback;
