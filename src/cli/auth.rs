use std::{io::Write, net::SocketAddr, path::PathBuf};

use indicatif::ProgressBar;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Stdin},
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
};

use crate::{
    api::CallbackState,
    config, error,
    error::AuthError,
    info,
    management::TokenManager,
    server::start_api_server,
    spotify::auth::{AuthPrompt, Authorizer},
    success, warning,
};

use super::spinner;

/// Asks for the redirect URL on the terminal.
pub struct TerminalPrompt {
    open_browser: bool,
    shown: bool,
    stdin: BufReader<Stdin>,
    spinner: Option<ProgressBar>,
}

impl TerminalPrompt {
    pub fn new(open_browser: bool) -> Self {
        Self {
            open_browser,
            shown: false,
            stdin: BufReader::new(tokio::io::stdin()),
            spinner: None,
        }
    }
}

impl AuthPrompt for TerminalPrompt {
    async fn redirected_url(&mut self, authorize_url: &str) -> Result<String, AuthError> {
        if !self.shown {
            info!("--- VOD Sync: First-Time Setup ---");
            info!("1. Open this URL in your browser:\n{}", authorize_url);
            info!("2. Log in and grant permission.");
            info!("3. You will be redirected. Copy the ENTIRE URL from your browser's address bar.");
            open_in_browser(self.open_browser, authorize_url);
            self.shown = true;
        }

        print!("4. Paste the full URL here and press Enter: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if self.stdin.read_line(&mut line).await? == 0 {
            return Err(AuthError::Input(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stdin was closed before a URL was pasted",
            )));
        }

        Ok(line.trim().to_string())
    }

    fn exchanging(&mut self) {
        self.spinner = Some(spinner("Exchanging authorization code..."));
    }

    fn rejected(&mut self, error: &AuthError) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        warning!("{}", error);
    }

    fn accepted(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Waits for the browser to come back to the local callback listener.
pub struct CallbackPrompt {
    open_browser: bool,
    addr: SocketAddr,
    redirects: UnboundedReceiver<String>,
    server: JoinHandle<()>,
    spinner: Option<ProgressBar>,
}

impl CallbackPrompt {
    pub async fn start(
        addr: &str,
        redirect_uri: String,
        open_browser: bool,
    ) -> Result<Self, std::io::Error> {
        let (tx, redirects) = mpsc::unbounded_channel();
        let state = CallbackState {
            redirect_uri,
            redirects: tx,
        };
        let (addr, server) = start_api_server(addr, state).await?;

        Ok(Self {
            open_browser,
            addr,
            redirects,
            server,
            spinner: None,
        })
    }
}

impl Drop for CallbackPrompt {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl AuthPrompt for CallbackPrompt {
    async fn redirected_url(&mut self, authorize_url: &str) -> Result<String, AuthError> {
        info!("Open this URL in your browser and grant permission:\n{}", authorize_url);
        open_in_browser(self.open_browser, authorize_url);

        self.spinner = Some(spinner(&format!(
            "Waiting for the browser to return to http://{}/callback ...",
            self.addr
        )));

        let redirected = self.redirects.recv().await;
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }

        redirected.ok_or_else(|| {
            AuthError::Input(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "callback listener stopped",
            ))
        })
    }

    fn exchanging(&mut self) {
        self.spinner = Some(spinner("Exchanging authorization code..."));
    }

    fn rejected(&mut self, error: &AuthError) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        warning!("{}", error);
    }

    fn accepted(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

fn open_in_browser(enabled: bool, url: &str) {
    if enabled && webbrowser::open(url).is_err() {
        warning!("Failed to open browser. Please navigate to the URL above manually.");
    }
}

/// Runs the handshake with the prompt selected on the command line.
pub async fn authorize(
    authorizer: &Authorizer,
    listen: bool,
    open_browser: bool,
    force: bool,
) -> Result<TokenManager, AuthError> {
    if listen {
        let mut prompt =
            CallbackPrompt::start(&config::server_addr(), config::spotify_redirect_uri(), open_browser)
                .await?;
        authorizer.ensure_authorized(&mut prompt, force).await
    } else {
        let mut prompt = TerminalPrompt::new(open_browser);
        authorizer.ensure_authorized(&mut prompt, force).await
    }
}

/// `vodsync auth`: authorize once and cache the token.
pub async fn auth(token_path: PathBuf, force: bool, listen: bool, open_browser: bool) {
    let authorizer = Authorizer::from_env(token_path);

    if !force && authorizer.cached().await.is_some() {
        success!(
            "Already authorized. Token cached at {}",
            authorizer.token_path().display()
        );
        return;
    }

    match authorize(&authorizer, listen, open_browser, true).await {
        Ok(tokens) => success!(
            "Authentication successful! Token saved to {}",
            tokens.path().display()
        ),
        Err(e) => error!("Authentication failed: {}", e),
    }
}
