//! # Watcher Module
//!
//! The polling loop that turns Spotify playback into the status file.
//!
//! Each iteration queries a [`PlaybackSource`], derives a [`PlaybackState`]
//! and hands it to the [`StatusPublisher`]. The outcome of an iteration is a
//! typed result and the delay before the next one is chosen from it by
//! [`PollSettings::delay_after`]:
//!
//! | Outcome | Delay |
//! |---------|-------|
//! | success | `interval` (0.5s) |
//! | rate limited | `max(error_backoff, Retry-After)` |
//! | any other error | `error_backoff` (10s) |
//!
//! Transient errors never end the loop. The only ways out are the
//! [`StopSignal`] and a login Spotify no longer accepts: a rejected refresh
//! token, or a streak of rejected access tokens. Both ask the caller to
//! authorize again.

mod credential;
mod signal;

pub use credential::{CredentialSlot, wait_for_credential};
pub use signal::StopSignal;

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::{
    error::PollError, management::StatusPublisher, spotify::playback::PlaybackSource,
    types::PlaybackState,
};

#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Pause between successful polls.
    pub interval: Duration,
    /// Pause after a failed poll.
    pub error_backoff: Duration,
    /// How often a waiting worker checks for a credential.
    pub auth_wait_interval: Duration,
    /// Consecutive 401 answers that end the loop with
    /// [`LoopExit::ReauthorizationRequired`].
    pub reauthorize_after: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            error_backoff: Duration::from_secs(10),
            auth_wait_interval: Duration::from_millis(500),
            reauthorize_after: 3,
        }
    }
}

impl PollSettings {
    pub fn delay_after(&self, result: &Result<PollOutcome, PollError>) -> Duration {
        match result {
            Ok(_) => self.interval,
            Err(PollError::RateLimited(retry_after)) => (*retry_after).max(self.error_backoff),
            Err(_) => self.error_backoff,
        }
    }
}

/// What a successful iteration produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub state: PlaybackState,
    /// Whether the status file was rewritten.
    pub written: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Stopped,
    ReauthorizationRequired,
}

/// Progress notifications for whoever displays the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Status(String),
    Published(PlaybackState),
    PollFailed { error: String, retry_in: Duration },
    ReauthorizationRequired,
}

/// The poll loop context: publisher, timing and the channels around it.
pub struct PollLoop {
    publisher: StatusPublisher,
    settings: PollSettings,
    stop: StopSignal,
    events: Option<UnboundedSender<WatchEvent>>,
    unauthorized_streak: u32,
}

impl PollLoop {
    pub fn new(publisher: StatusPublisher, settings: PollSettings, stop: StopSignal) -> Self {
        Self {
            publisher,
            settings,
            stop,
            events: None,
            unauthorized_streak: 0,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<WatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn publisher(&self) -> &StatusPublisher {
        &self.publisher
    }

    /// Runs one iteration: query, derive, publish.
    pub async fn poll_once<S: PlaybackSource>(
        &mut self,
        source: &mut S,
    ) -> Result<PollOutcome, PollError> {
        let playback = source.current_playback().await?;
        let state = PlaybackState::from_playback(playback.as_ref());
        let written = self.publisher.publish(&state).await?;

        Ok(PollOutcome { state, written })
    }

    /// Polls until stopped or until the login is no longer accepted.
    ///
    /// The stop signal is checked before each query and before each sleep.
    /// A query or sleep that already started always runs to completion.
    pub async fn run<S: PlaybackSource>(&mut self, source: &mut S) -> LoopExit {
        self.unauthorized_streak = 0;

        loop {
            if self.stop.is_stopped() {
                return LoopExit::Stopped;
            }

            let result = self.poll_once(source).await;
            let delay = self.settings.delay_after(&result);

            match &result {
                Ok(outcome) => {
                    self.unauthorized_streak = 0;
                    if outcome.written {
                        self.emit(WatchEvent::Published(outcome.state.clone()));
                    }
                }
                Err(e) => {
                    match e {
                        PollError::Revoked(_) => {
                            self.emit(WatchEvent::ReauthorizationRequired);
                            return LoopExit::ReauthorizationRequired;
                        }
                        PollError::Unauthorized => {
                            self.unauthorized_streak += 1;
                            if self.unauthorized_streak >= self.settings.reauthorize_after {
                                self.emit(WatchEvent::ReauthorizationRequired);
                                return LoopExit::ReauthorizationRequired;
                            }
                        }
                        _ => self.unauthorized_streak = 0,
                    }

                    self.emit(WatchEvent::PollFailed {
                        error: e.to_string(),
                        retry_in: delay,
                    });
                }
            }

            if self.stop.is_stopped() {
                return LoopExit::Stopped;
            }
            tokio::time::sleep(delay).await;
        }
    }

    pub fn emit(&self, event: WatchEvent) {
        if let Some(events) = &self.events {
            // nobody listening is fine, the file is the real output
            let _ = events.send(event);
        }
    }
}
