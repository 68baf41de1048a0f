//! # Status Window
//!
//! A terminal window variant of the watcher. It shows the status and the
//! current song and, while authorization is pending, the login URL and an
//! input field for the redirected URL.
//!
//! Two execution contexts exist: the UI loop on the calling task, which is the
//! only writer of [`App`] state, and a spawned worker running the poll loop.
//! The worker talks to the UI only through an mpsc channel of
//! [`WatchEvent`]s. A pasted URL is exchanged in a short-lived task whose
//! result comes back as an [`AppMessage`]; on success the credential is
//! placed into the shared [`CredentialSlot`] the worker waits on.

mod app;
mod view;

pub use app::{App, AppAction, AppMessage};

use std::{io, path::PathBuf, sync::Arc, time::Duration};

use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    crossterm::{
        event, execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};
use tokio::sync::{
    Mutex,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};

use crate::{
    Res, info,
    management::StatusPublisher,
    spotify::{auth::Authorizer, playback::SpotifyPlayback},
    watcher::{
        CredentialSlot, LoopExit, PollLoop, PollSettings, StopSignal, WatchEvent,
        wait_for_credential,
    },
};

#[derive(Debug, Clone)]
pub struct TuiOptions {
    pub status_file: PathBuf,
    pub token_path: PathBuf,
    pub api_url: String,
    pub settings: PollSettings,
}

/// Runs the status window until the user quits.
pub async fn run(opts: TuiOptions) -> Res<()> {
    let authorizer = Authorizer::from_env(opts.token_path.clone());
    let stop = StopSignal::new();
    let slot: CredentialSlot = Arc::new(Mutex::new(None));

    let mut app = App::new(opts.status_file.clone());
    match authorizer.cached().await {
        Some(tokens) => {
            *slot.lock().await = Some(tokens);
            app.set_status("Authorized. Waiting for the first poll...");
        }
        None => app.require_login(authorizer.begin()?),
    }

    let (watch_tx, watch_rx) = mpsc::unbounded_channel();
    let poll_loop = PollLoop::new(
        StatusPublisher::new(opts.status_file.clone()),
        opts.settings.clone(),
        stop.clone(),
    )
    .with_events(watch_tx);
    let worker = tokio::spawn(worker(poll_loop, slot.clone(), stop.clone(), opts.api_url.clone()));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let (tx, rx) = mpsc::unbounded_channel::<AppMessage>();
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || {
        while !input_tx.is_closed() {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if input_tx.send(AppMessage::Terminal(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        }
    });

    let ui = UiLoop {
        authorizer,
        slot,
        tx,
    };
    let result = ui.run(&mut terminal, &mut app, rx, watch_rx).await;

    stop.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("Waiting for the watcher to finish its current cycle...");
    let _ = worker.await;

    result
}

/// Waits for a credential, polls, and starts over when Spotify asks for a new login.
async fn worker(mut poll_loop: PollLoop, slot: CredentialSlot, stop: StopSignal, api_url: String) {
    loop {
        let interval = poll_loop.settings().auth_wait_interval;
        let Some(tokens) = wait_for_credential(&slot, &stop, interval).await else {
            return;
        };

        poll_loop.emit(WatchEvent::Status("Authorized. Watching Spotify playback".to_string()));
        let mut source = SpotifyPlayback::new(api_url.clone(), tokens);
        match poll_loop.run(&mut source).await {
            LoopExit::Stopped => return,
            LoopExit::ReauthorizationRequired => continue,
        }
    }
}

struct UiLoop {
    authorizer: Authorizer,
    slot: CredentialSlot,
    tx: UnboundedSender<AppMessage>,
}

impl UiLoop {
    async fn run(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: &mut App,
        mut rx: UnboundedReceiver<AppMessage>,
        mut watch_rx: UnboundedReceiver<WatchEvent>,
    ) -> Res<()> {
        loop {
            terminal.draw(|f| view::draw(f, app))?;

            let action = tokio::select! {
                Some(msg) = rx.recv() => app.handle_message(msg),
                Some(event) = watch_rx.recv() => app.handle_watch_event(event),
                else => AppAction::Quit,
            };

            match action {
                AppAction::None => {}
                AppAction::Quit => return Ok(()),
                AppAction::OpenLogin(url) => {
                    if webbrowser::open(&url).is_err() {
                        app.set_auth_error("Could not open a browser, copy the URL above instead.");
                    }
                }
                AppAction::Submit(redirected_url) => self.submit(app, redirected_url),
                AppAction::BeginLogin => match self.authorizer.begin() {
                    Ok(pending) => app.require_login(pending),
                    Err(e) => app.set_auth_error(e.to_string()),
                },
            }
        }
    }

    /// Exchanges the pasted URL off the UI loop; the result comes back as a message.
    fn submit(&self, app: &mut App, redirected_url: String) {
        let Some(pending) = app.pending().cloned() else {
            return;
        };

        let authorizer = self.authorizer.clone();
        let slot = self.slot.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match authorizer.complete(&pending, &redirected_url).await {
                Ok(tokens) => {
                    *slot.lock().await = Some(tokens);
                    AppMessage::AuthSucceeded
                }
                Err(e) => AppMessage::AuthFailed(e.to_string()),
            };
            let _ = tx.send(message);
        });
    }
}
