//! # API Module
//!
//! This module provides the HTTP endpoints of the optional local callback
//! listener (`--listen`). It implements the OAuth redirect target and a health
//! check.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`callback`] - Receives the browser redirect from Spotify's authorization server
//!   and forwards the full redirect URL to the waiting authorizer, which parses the
//!   code and exchanges it exactly as it does for a pasted URL.
//!
//! ### Monitoring
//!
//! - [`health`] - Provides a health check endpoint that returns application status
//!   and version information for monitoring systems and load balancers.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use vodsync::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```
//!
//! ## Dependencies
//!
//! This module depends on:
//! - [`axum`] for HTTP server functionality
//! - [`tokio`] for async runtime support
//! - [`serde_json`] for JSON serialization
//!
//! ## Related Modules
//!
//! - [`crate::server`] - Binds the listener and routes these endpoints
//! - [`crate::cli`] - The `--listen` prompt that consumes forwarded redirects

mod callback;
mod health;

pub use callback::{CallbackState, callback, redirected_url};
pub use health::health;
