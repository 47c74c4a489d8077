mod commands;

use crate::commands::{Command, HELP};
use fadetext_core::{
    CoreError, FadeTextConfig, RotationEvent, Rotator, RotatorHandle, TomlParseError,
};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const APP_NAME: &str = "fadetext";
const LOG_TARGET: &str = "fadetext::demo";

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),
}

fn main() {
    // Tracing starts before the full config load so load errors get logged
    init_tracing(file_logging_requested());

    // Load config or create template on first run
    let config = match FadeTextConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            print_new_config_notice(&path);
            std::process::exit(0);
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            print_config_parse_error(&parse_error, &FadeTextConfig::config_path());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let result = runtime.block_on(run(&config, cancel_token));

    // A pending stdin read would otherwise hold the runtime open
    runtime.shutdown_timeout(Duration::from_millis(100));

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: &FadeTextConfig, cancel_token: CancellationToken) -> Result<(), DemoError> {
    let (rotator, handle) = Rotator::new(config, Some(cancel_token.clone()))?;
    let printer = tokio::spawn(print_events(handle.clone()));
    let rotator_task = rotator.start();

    info!(target: LOG_TARGET, "Type `help` for commands");
    let result = read_commands(&handle, &cancel_token).await;

    handle.shutdown();
    if let Err(e) = rotator_task.await {
        error!(target: LOG_TARGET, "Rotator task failed: {e}");
    }
    let _ = printer.await;

    result
}

/// Run stdin commands against the rotator until quit or shutdown
async fn read_commands(
    handle: &RotatorHandle,
    cancel_token: &CancellationToken,
) -> Result<(), DemoError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = cancel_token.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            // stdin closed; keep rotating until Ctrl+C
            debug!(target: LOG_TARGET, "stdin closed");
            cancel_token.cancelled().await;
            return Ok(());
        };

        let command = match line.parse::<Command>() {
            Ok(Command::Quit) => return Ok(()),
            Ok(command) => command,
            Err(commands::ParseError::Empty) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match apply(handle, command).await {
            Ok(()) => {}
            Err(CoreError::InvalidConfiguration(reason)) if reason.is_timeout() => {
                warn!(target: LOG_TARGET, "Rejected: {reason}; keeping the previous timeout");
            }
            Err(CoreError::InvalidConfiguration(reason)) => {
                warn!(target: LOG_TARGET, "Rejected: {reason}");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn apply(handle: &RotatorHandle, command: Command) -> Result<(), CoreError> {
    match command {
        Command::Pause => handle.pause().await,
        Command::Resume => handle.resume().await,
        Command::Stop => handle.stop().await,
        Command::Restart => handle.restart().await,
        Command::Shuffle => handle.shuffle().await,
        Command::Refresh => handle.force_refresh().await,
        Command::JumpTo(index) => handle.jump_to(index).await,
        Command::Timeout { amount, unit } => handle.set_timeout(amount, unit).await,
        Command::Texts(texts) => handle.set_texts(texts).await,
        Command::Status => {
            let snapshot = handle.snapshot().await?;
            let count = snapshot.texts.as_ref().map_or(0, Vec::len);
            eprintln!(
                "{} | text {}/{} {:?} | every {:?}",
                snapshot.state,
                snapshot.position + 1,
                count,
                snapshot.current_text.unwrap_or_default(),
                snapshot.interval,
            );
            Ok(())
        }
        Command::Help => {
            eprintln!("{HELP}");
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

/// Print displayed texts to stdout and log animation events
async fn print_events(handle: RotatorHandle) {
    let mut rx = handle.subscribe();
    let cancel_token = handle.cancel_token();
    drop(handle);

    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = rx.recv() => event,
        };

        match event {
            Ok(RotationEvent::TextDisplayed { text }) => println!("{text}"),
            Ok(RotationEvent::FadeStarted { fade }) => {
                debug!(target: LOG_TARGET, "{fade} started");
            }
            Ok(RotationEvent::AnimationCancelled { fade }) => {
                debug!(target: LOG_TARGET, "{fade} cancelled");
            }
            Ok(RotationEvent::Redraw) => {}
            Err(RecvError::Closed) => {
                info!(target: LOG_TARGET, "Rotation event channel closed");
                break;
            }
            Err(RecvError::Lagged(n)) => {
                info!(target: LOG_TARGET, "Missed {} rotation events", n);
            }
        }
    }
}

fn print_new_config_notice(config_path: &Path) {
    eprintln!(
        "Welcome to {APP_NAME}!\n\n\
         A configuration file has been created at:\n{}\n\n\
         Edit the texts and timings, then run {APP_NAME} again.",
        config_path.display()
    );
}

fn print_config_parse_error(parse_error: &TomlParseError, config_path: &Path) {
    let location = parse_error
        .span()
        .map(|span| format!(" (at byte {})", span.start))
        .unwrap_or_default();

    eprintln!(
        "The configuration file has syntax errors{location}:\n\n{}\n\n\
         Location: {}\n\n\
         Fix the file, or delete it to regenerate the default template.",
        parse_error.message(),
        config_path.display()
    );
}

/// Read `[logging] enabled` without validating the rest of the config
fn file_logging_requested() -> bool {
    std::fs::read_to_string(FadeTextConfig::config_path())
        .ok()
        .and_then(|content| toml::from_str::<FadeTextConfig>(&content).ok())
        .is_some_and(|config| config.logging.enabled)
}

/// Create the log file, reporting failure on stderr
fn open_log_file() -> Option<File> {
    let log_path = fadetext_core::log_file_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    File::create(&log_path)
        .map_err(|e| eprintln!("Failed to create log file at {}: {e}", log_path.display()))
        .ok()
}

/// Install the subscriber: stderr always, plus an optional plain-text file.
///
/// Displayed texts own stdout, so console logs go to stderr.
fn init_tracing(file_logging: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = file_logging.then(open_log_file).flatten().map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(Arc::new(file))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}
