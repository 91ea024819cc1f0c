//! # Ground Station
//!
//! Serial telemetry ground station for rocket flight computers.
//!
//! Reads CSV telemetry lines from the flight computer, keeps per-channel
//! series for plotting, and sends operator commands back over the link.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use ground_station::config::{Config, LoggingConfig};
use ground_station::console::{OperatorAction, HELP};
use ground_station::presentation::{run_presenter, JsonLinesPresenter, Presenter, TextPresenter};
use ground_station::serial::{list_ports, LinkOpener, TokioSerialOpener};
use ground_station::session::Session;

/// Config file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/ground-station.toml";

/// Main entry point for the ground station
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (CLI path, then `config/ground-station.toml`,
///      then built-in defaults)
///    - Set up logging to stderr and optionally a rolling file
///    - Start the presenter on stdout
///    - Connect to the configured port, if any
///
/// 2. **Main Loop** (single task, one branch at a time)
///    - Fast tick: read and record at most one telemetry line
///    - Slow tick: liveness check and reconnect
///    - Operator lines from stdin
///    - Ctrl+C or `:quit` to exit
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/ground-station.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("Ground Station v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut session = Session::new(
        TokioSerialOpener,
        config.serial.read_timeout(),
        config.display.event_buffer,
    );

    let presenter: Box<dyn Presenter> = match config.display.format.as_str() {
        "jsonl" => Box::new(JsonLinesPresenter::new(std::io::stdout())),
        _ => Box::new(TextPresenter::new(std::io::stdout())),
    };
    let presenter_task = tokio::spawn(run_presenter(presenter, session.subscribe()));

    if let Some(port) = config.serial.startup_port() {
        // Failure is logged by the session; the operator can retry with :connect
        let _ = session.connect(port);
    }

    let mut poll_interval = interval(config.serial.poll_interval());
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut liveness_interval = interval(config.serial.liveness_interval());
    liveness_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!(
        "Polling every {}ms, liveness check every {}ms",
        config.serial.poll_interval_ms, config.serial.liveness_interval_ms
    );
    info!("Type :help for commands, Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                session.poll_telemetry().await;
            }

            _ = liveness_interval.tick() => {
                session.check_liveness();
            }

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_operator_line(&mut session, &line).await {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Operator input closed; telemetry continues until Ctrl+C");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read operator input: {}", e);
                    stdin_open = false;
                }
            },

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Samples recorded this session: {}", session.store().len());
    drop(session);
    presenter_task.await.context("presenter task failed")?;

    Ok(())
}

/// Apply one operator line; returns `false` when the operator quits
async fn handle_operator_line<O: LinkOpener>(session: &mut Session<O>, line: &str) -> bool {
    let Some(action) = OperatorAction::parse(line) else {
        return true;
    };

    match action {
        OperatorAction::Connect(port) => {
            let _ = session.connect(&port);
        }
        OperatorAction::ListPorts => match list_ports() {
            Ok(ports) if ports.is_empty() => info!("No serial ports found"),
            Ok(ports) => info!("Available ports: {}", ports.join(", ")),
            Err(e) => warn!("{}", e),
        },
        OperatorAction::Send(command) => {
            let _ = session.send(&command).await;
        }
        OperatorAction::Reset => session.reset(),
        OperatorAction::Help => info!("Commands:\n{}", HELP),
        OperatorAction::Quit => return false,
        OperatorAction::Invalid(msg) => warn!("{}", msg),
    }
    true
}

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("failed to load config {}", path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("failed to load config {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Stderr logging plus an optional daily rolling file
///
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let (file_layer, guard) = if config.dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.dir, "ground-station.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_path_shipped() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        assert!(path.exists(), "{} should exist", DEFAULT_CONFIG_PATH);
        assert!(Config::load(path).is_ok());
    }

    #[tokio::test]
    async fn test_help_and_quit_lines() {
        let mut session = Session::new(TokioSerialOpener, Duration::from_secs(1), 16);
        let mut events = session.subscribe();

        assert!(handle_operator_line(&mut session, ":help").await);
        assert!(handle_operator_line(&mut session, "   ").await);
        assert!(events.try_recv().is_err());

        assert!(!handle_operator_line(&mut session, ":quit").await);
    }

    #[test]
    fn test_intervals_match_defaults() {
        let config = Config::default();
        assert_eq!(config.serial.poll_interval_ms, 100);
        assert_eq!(config.serial.liveness_interval_ms, 5000);
    }
}
