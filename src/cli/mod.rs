//! # CLI Module
//!
//! This module provides the command-line interface layer for vodsync. It
//! implements the user-facing commands and coordinates between the Spotify
//! integration, the poll loop and the terminal.
//!
//! ## Commands
//!
//! - [`watch`] - Default command. Authorizes on first run, then polls Spotify
//!   and keeps the status file up to date until `Ctrl+C`
//! - [`auth`] - Runs the authorization handshake only and caches the token
//! - [`status`] - Prints the last published status as a table
//!
//! ## Authorization Prompts
//!
//! Two [`AuthPrompt`](crate::spotify::auth::AuthPrompt) implementations live here:
//!
//! - [`TerminalPrompt`] prints setup instructions and reads the pasted
//!   redirect URL from stdin
//! - [`CallbackPrompt`] starts the local callback listener (`--listen`) and
//!   waits for the browser to come back to it
//!
//! ## Output
//!
//! Messages go through the `info!`, `success!`, `warning!` and `error!`
//! macros. Once polling runs, the text mode is silent unless a poll fails.
//!
//! ## Usage Patterns
//!
//! ```bash
//! vodsync                          # authorize if needed, then watch
//! vodsync auth --listen --open     # capture the redirect on SERVER_ADDRESS
//! vodsync run --tui                # status window with in-app login
//! vodsync status                   # show what was published last
//! ```

mod auth;
mod run;
mod status;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use auth::CallbackPrompt;
pub use auth::TerminalPrompt;
pub use auth::auth;
pub use auth::authorize;
pub use run::WatchOptions;
pub use run::watch;
pub use status::status;
pub use status::status_rows;

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
