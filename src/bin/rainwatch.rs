//! CLI binary for rainwatch.

use clap::{Parser, Subcommand};
use rainwatch::config::PositionSourceKind;
use rainwatch::position::{PositionSource, parse_lat_lon};
use rainwatch::scheduler::{FetchOutcome, run_tick};
use rainwatch::{
    ContentFetcher, ErrorReporter, NETHERLANDS, Navigation, TerminalView, TickRunner, Visibility,
    ViewSurface, WatchConfig, navigation_for,
};
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Rainwatch: keeps a rain nowcast in sync with your position.
#[derive(Parser)]
#[command(name = "rainwatch", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use these coordinates instead of the configured source, e.g. `52.36,4.89`.
    #[arg(long, global = true, value_name = "LAT,LON", value_parser = parse_coordinates)]
    at: Option<(f64, f64)>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Keep the forecast refreshed. Type `hide` or `show` on stdin to
    /// simulate page visibility.
    Watch,

    /// Refresh once and exit.
    Once,

    /// Print where the one-shot redirect would send the page.
    Locate {
        /// Path the page is currently on.
        #[arg(long, default_value = "/")]
        from: String,
    },

    /// Validate and print the effective configuration.
    Check,
}

fn parse_coordinates(input: &str) -> Result<(f64, f64), String> {
    parse_lat_lon(input).ok_or_else(|| format!("expected LAT,LON, got {input:?}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rainwatch=info,rainwatch_fetch=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => WatchConfig::from_file(path)?,
        None => {
            let path = WatchConfig::default_config_path();
            if path.exists() {
                debug!(path = %path.display(), "loading default config");
                WatchConfig::from_file(&path)?
            } else {
                WatchConfig::default()
            }
        }
    };
    if let Some((latitude, longitude)) = cli.at {
        config.position.source = PositionSourceKind::Fixed;
        config.position.latitude = latitude;
        config.position.longitude = longitude;
    }
    config.validate()?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => run_watch(config).await,
        Command::Once => run_once(config).await,
        Command::Locate { from } => run_locate(config, &from).await,
        Command::Check => run_check(&config),
    }
}

async fn run_watch(config: WatchConfig) -> anyhow::Result<()> {
    let fetcher = ContentFetcher::new(config.server.clone())?;
    let source = config.position_source()?;
    let runner = TickRunner::new(source, fetcher, TerminalView)
        .with_tick_interval(config.schedule.tick_interval())
        .with_max_position_age(config.schedule.max_position_age());

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });

    let (visibility_tx, visibility_rx) = mpsc::channel(8);
    tokio::spawn(forward_visibility(visibility_tx));

    eprintln!("Watching {}. Type `hide` or `show`, Ctrl+C to quit.", config.server.base_url);
    runner.run(visibility_rx, cancel).await;
    Ok(())
}

/// Turn `hide`/`show` lines on stdin into visibility events.
async fn forward_visibility(tx: mpsc::Sender<Visibility>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin closed: {e}");
                break;
            }
        };
        let event = match line.trim() {
            "hide" | "hidden" => Visibility::Hidden,
            "show" | "visible" => Visibility::Visible,
            "" => continue,
            other => {
                warn!("unknown command {other:?}, expected `hide` or `show`");
                continue;
            }
        };
        if tx.send(event).await.is_err() {
            break;
        }
    }
}

async fn run_once(config: WatchConfig) -> anyhow::Result<()> {
    let fetcher = ContentFetcher::new(config.server.clone())?;
    let source = config.position_source()?;
    let view = TerminalView;

    match run_tick(
        &source,
        &fetcher,
        &NETHERLANDS,
        config.schedule.max_position_age(),
    )
    .await
    {
        FetchOutcome::Success(html) => {
            view.set_content(&html);
            Ok(())
        }
        FetchOutcome::Failure(err) => {
            ErrorReporter.report(&view, Some(&err.to_string()));
            Err(err.into())
        }
    }
}

async fn run_locate(config: WatchConfig, from: &str) -> anyhow::Result<()> {
    let source = config.position_source()?;
    let position = source
        .current_position(config.schedule.max_position_age())
        .await?;

    match navigation_for(&position, from, &NETHERLANDS)? {
        Navigation::Navigate(path) => println!("navigate {path}"),
        Navigation::Reload => println!("reload {from}"),
    }
    Ok(())
}

fn run_check(config: &WatchConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    println!("{rendered}");
    eprintln!("config ok");
    Ok(())
}
