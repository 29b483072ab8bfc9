//! Adivina terminal client - Main entry point
//!
//! Plays "guess the song" against a game server from the terminal. Audio is
//! reported on the console rather than decoded.

use std::path::PathBuf;
use std::sync::Arc;

use adivina_client::audio::ConsoleOutput;
use adivina_client::terminal::{self, Command, HELP};
use adivina_client::{HttpGameServer, RoundController};
use adivina_common::config::{ConfigResolver, CONFIG_ENV, SERVER_URL_ENV};
use adivina_common::events::EventBus;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for adivina
#[derive(Parser, Debug)]
#[command(name = "adivina")]
#[command(about = "Guess the song from short audio fragments")]
#[command(version)]
struct Args {
    /// Game server base URL
    #[arg(short, long, env = SERVER_URL_ENV)]
    server: Option<String>,

    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Playlist to play
    #[arg(short, long)]
    playlist: Option<String>,

    /// Display name of the playlist
    #[arg(long)]
    playlist_name: Option<String>,

    /// Log level when RUST_LOG is not set (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new()
        .with_config_path(args.config.clone())
        .with_server_url(args.server.clone())
        .resolve()
        .context("Failed to load configuration")?;

    // Logs go to stderr so they do not interleave with the game on stdout
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("adivina={level},adivina_client={level},adivina_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Adivina against {}", config.server_url);

    let server = Arc::new(
        HttpGameServer::from_config(&config).context("Failed to create game server client")?,
    );
    let events = Arc::new(EventBus::default());
    let controller = Arc::new(RoundController::new(
        server,
        Arc::new(ConsoleOutput::new()),
        Arc::clone(&events),
        &config,
    ));

    let renderer = tokio::spawn(render_events(events.subscribe()));

    let playlist_name = controller
        .start_game(args.playlist.clone(), args.playlist_name.clone())
        .await
        .context("Failed to start game")?;
    info!("Playing {}", playlist_name);
    println!("{}", HELP);

    let reset_session = tokio::select! {
        result = input_loop(Arc::clone(&controller)) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            false
        }
    };

    if reset_session {
        controller.leave_game().await;
    }
    renderer.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Read commands from stdin until EOF, `:quit` or `:leave`
///
/// Returns true when the server session should be reset.
async fn input_loop(controller: Arc<RoundController>) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match Command::parse(&line) {
            Command::Play => {
                controller.play_fragment().await;
            }
            Command::Next => {
                if controller.phase().await.is_terminal() {
                    controller.start_round().await;
                } else {
                    println!("Finish the current song first");
                }
            }
            Command::Leave => return Ok(true),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(false),
            Command::Guess(guess) => {
                controller.submit_guess(&guess).await;
            }
        }
    }
    Ok(false)
}

async fn render_events(mut rx: tokio::sync::broadcast::Receiver<adivina_common::events::GameEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                for line in terminal::render(&event) {
                    println!("{}", line);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!("Display skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
