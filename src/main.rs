use std::{path::PathBuf, time::Duration};

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use vodsync::{cli, config, error, tui, watcher::PollSettings};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
  args_conflicts_with_subcommands = true // `vodsync --tui` or `vodsync run --tui`, not both
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    #[clap(flatten)]
    run: RunOptions,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Watch Spotify playback and publish it to the status file (default)
    Run(RunOptions),

    /// Authorize with Spotify and cache the token
    Auth(AuthOptions),

    /// Show the last published status
    Status(StatusOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct RunOptions {
    /// Show a status window with in-app login instead of plain text output
    #[clap(long)]
    pub tui: bool,

    /// Capture the login redirect on SERVER_ADDRESS instead of asking to paste it
    #[clap(long, conflicts_with = "tui")]
    pub listen: bool,

    /// Open the login page in the default browser
    #[clap(long)]
    pub open: bool,

    /// Status file to write (defaults to VODSYNC_STATUS_FILE or the temp dir)
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// Token cache file (defaults to VODSYNC_TOKEN_CACHE or the data dir)
    #[clap(long)]
    pub token_cache: Option<PathBuf>,

    /// Pause between polls in milliseconds
    #[clap(long, default_value_t = 500)]
    pub interval_ms: u64,

    /// Pause after a failed poll in seconds
    #[clap(long, default_value_t = 10)]
    pub backoff_secs: u64,
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Ignore a cached token and authorize again
    #[clap(long)]
    pub force: bool,

    /// Capture the login redirect on SERVER_ADDRESS instead of asking to paste it
    #[clap(long)]
    pub listen: bool,

    /// Open the login page in the default browser
    #[clap(long)]
    pub open: bool,

    /// Token cache file (defaults to VODSYNC_TOKEN_CACHE or the data dir)
    #[clap(long)]
    pub token_cache: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct StatusOptions {
    /// Status file to read (defaults to VODSYNC_STATUS_FILE or the temp dir)
    #[clap(long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

impl RunOptions {
    fn settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.interval_ms),
            error_backoff: Duration::from_secs(self.backoff_secs),
            ..PollSettings::default()
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run(cli.run)) {
        Command::Run(opt) => {
            let status_file = opt.output.clone().unwrap_or_else(config::status_file);
            let token_path = opt.token_cache.clone().unwrap_or_else(config::token_cache_path);

            if opt.tui {
                let opts = tui::TuiOptions {
                    status_file,
                    token_path,
                    api_url: config::spotify_apiurl(),
                    settings: opt.settings(),
                };
                if let Err(e) = tui::run(opts).await {
                    error!("Status window failed: {}", e);
                }
            } else {
                cli::watch(cli::WatchOptions {
                    status_file,
                    token_path,
                    settings: opt.settings(),
                    listen: opt.listen,
                    open_browser: opt.open,
                })
                .await
            }
        }
        Command::Auth(opt) => {
            let token_path = opt.token_cache.unwrap_or_else(config::token_cache_path);
            cli::auth(token_path, opt.force, opt.listen, opt.open).await
        }
        Command::Status(opt) => {
            let status_file = opt.output.unwrap_or_else(config::status_file);
            cli::status(&status_file).await
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
