use std::{path::PathBuf, time::Duration};

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::{
    config, error, info,
    management::StatusPublisher,
    spotify::{auth::Authorizer, playback::SpotifyPlayback},
    success, warning,
    watcher::{LoopExit, PollLoop, PollSettings, StopSignal, WatchEvent},
};

use super::auth::authorize;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub status_file: PathBuf,
    pub token_path: PathBuf,
    pub settings: PollSettings,
    pub listen: bool,
    pub open_browser: bool,
}

/// Text-mode watcher: authorize if needed, then poll until `Ctrl+C`.
///
/// After the first-run setup the watcher stays silent and only prints when a
/// poll fails or Spotify stops accepting the saved token, in which case the
/// authorization prompt is shown again.
pub async fn watch(opts: WatchOptions) {
    let authorizer = Authorizer::from_env(opts.token_path.clone());
    let stop = StopSignal::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let publisher = StatusPublisher::new(opts.status_file.clone());
    let mut poll_loop = PollLoop::new(publisher, opts.settings.clone(), stop.clone()).with_events(tx);

    tokio::spawn(print_events(rx));

    let ctrlc_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stopping after the current cycle...");
            ctrlc_stop.stop();
        }
    });

    let mut force = false;
    let mut announced = false;

    loop {
        let authorized = tokio::select! {
            result = authorize(&authorizer, opts.listen, opts.open_browser, force) => result,
            _ = stop.stopped(Duration::from_millis(200)) => {
                // a pending stdin read cannot be cancelled, leave without waiting for it
                std::process::exit(0);
            }
        };

        let tokens = match authorized {
            Ok(tokens) => tokens,
            Err(e) => error!("Authorization failed: {}", e),
        };

        if !announced {
            info!("--- VOD Sync Spotify Watcher (v{}) ---", env!("CARGO_PKG_VERSION"));
            success!(
                "Successfully authenticated. Writing status to: {}",
                poll_loop.publisher().path().display()
            );
            info!("This window can be minimized...");
            announced = true;
        }

        let mut source = SpotifyPlayback::new(config::spotify_apiurl(), tokens);
        match poll_loop.run(&mut source).await {
            LoopExit::Stopped => break,
            LoopExit::ReauthorizationRequired => {
                warning!("Spotify no longer accepts the saved login. Please authorize again.");
                force = true;
            }
        }
    }
}

async fn print_events(mut rx: UnboundedReceiver<WatchEvent>) {
    while let Some(event) = rx.recv().await {
        if let WatchEvent::PollFailed { error, retry_in } = event {
            warning!(
                "An error occurred: {}. Retrying in {}s",
                error,
                retry_in.as_secs_f32()
            );
        }
    }
}
