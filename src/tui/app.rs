use std::path::PathBuf;

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tui_input::{Input, backend::crossterm::EventHandler};

use crate::{
    types::{PendingAuthorization, PlaybackState},
    utils,
    watcher::WatchEvent,
};

/// Everything the UI loop reacts to besides loop events.
#[derive(Debug)]
pub enum AppMessage {
    Terminal(Event),
    AuthSucceeded,
    AuthFailed(String),
}

/// What the UI loop has to do after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    None,
    Quit,
    OpenLogin(String),
    Submit(String),
    BeginLogin,
}

/// View state of the status window. Only the UI loop mutates it.
pub struct App {
    status: String,
    song: String,
    status_file: PathBuf,
    pending: Option<PendingAuthorization>,
    input: Input,
    auth_error: Option<String>,
    submitting: bool,
}

impl App {
    pub fn new(status_file: PathBuf) -> Self {
        Self {
            status: "Starting...".to_string(),
            song: "Nothing playing".to_string(),
            status_file,
            pending: None,
            input: Input::default(),
            auth_error: None,
            submitting: false,
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn song(&self) -> &str {
        &self.song
    }

    pub fn status_file(&self) -> &PathBuf {
        &self.status_file
    }

    pub fn pending(&self) -> Option<&PendingAuthorization> {
        self.pending.as_ref()
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn auth_error(&self) -> Option<&str> {
        self.auth_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn set_auth_error(&mut self, error: impl Into<String>) {
        self.auth_error = Some(error.into());
        self.submitting = false;
    }

    /// Shows the login controls for `pending`.
    pub fn require_login(&mut self, pending: PendingAuthorization) {
        self.pending = Some(pending);
        self.input.reset();
        self.submitting = false;
        self.status = "Waiting for Spotify login".to_string();
    }

    pub fn handle_message(&mut self, message: AppMessage) -> AppAction {
        match message {
            AppMessage::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                self.handle_key(key)
            }
            AppMessage::Terminal(_) => AppAction::None,
            AppMessage::AuthSucceeded => {
                self.pending = None;
                self.auth_error = None;
                self.submitting = false;
                self.input.reset();
                self.status = "Authorized. Waiting for the first poll...".to_string();
                AppAction::None
            }
            AppMessage::AuthFailed(error) => {
                self.set_auth_error(error);
                AppAction::None
            }
        }
    }

    pub fn handle_watch_event(&mut self, event: WatchEvent) -> AppAction {
        match event {
            WatchEvent::Status(status) => self.status = status,
            WatchEvent::Published(state) => {
                self.status = "Watching Spotify playback".to_string();
                self.song = describe(&state);
            }
            WatchEvent::PollFailed { error, retry_in } => {
                self.status = format!(
                    "Error: {}. Retrying in {}s",
                    error,
                    retry_in.as_secs_f32()
                );
            }
            WatchEvent::ReauthorizationRequired => {
                self.status = "Spotify no longer accepts the saved login, please log in again".to_string();
                return AppAction::BeginLogin;
            }
        }
        AppAction::None
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return AppAction::Quit,
            KeyCode::Esc => return AppAction::Quit,
            _ => {}
        }

        let Some(pending) = &self.pending else {
            return match key.code {
                KeyCode::Char('q') => AppAction::Quit,
                _ => AppAction::None,
            };
        };

        match key.code {
            KeyCode::Char('o') if ctrl => AppAction::OpenLogin(pending.authorize_url.clone()),
            KeyCode::Enter => {
                let value = self.input.value().trim().to_string();
                if self.submitting || value.is_empty() {
                    return AppAction::None;
                }
                self.submitting = true;
                self.auth_error = None;
                AppAction::Submit(value)
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                AppAction::None
            }
        }
    }
}

fn describe(state: &PlaybackState) -> String {
    if state.title.is_none() {
        return state.song_line();
    }

    let mut line = format!(
        "{}  [{} / {}]",
        state.song_line(),
        utils::format_ms(state.progress_ms),
        utils::format_ms(state.duration_ms)
    );
    if !state.is_playing {
        line.push_str("  (paused)");
    }
    line
}
