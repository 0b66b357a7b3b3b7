//! Ticker Poller — Entry Point
//!
//! Headless driver for the polling engine. Stands in for the chart
//! window: it logs the newest value of every series on a redraw
//! cadence and takes pause/resume commands from stdin.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from the first argument) + validate
//! 2. Init tracing (JSON or pretty structured logging)
//! 3. Build provider chains and start the PollSupervisor
//! 4. Spawn health/metrics server (/live, /ready, /metrics)
//! 5. Spawn console renderer and stdin command reader
//! 6. Apply commands until Ctrl-C or `quit` → bounded shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use ticker_poller::adapters::metrics::{HealthServer, HealthState};
use ticker_poller::config::chains::ConfiguredChains;
use ticker_poller::config::{self, AppConfig, LogFormat};
use ticker_poller::domain::SeriesKey;
use ticker_poller::usecases::PollSupervisor;

/// An operator command read from stdin.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Pause(SeriesKey),
    Resume(SeriesKey),
    Toggle(SeriesKey),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?.to_ascii_lowercase();
    let arg = parts.next().map(SeriesKey::new);

    match (verb.as_str(), arg) {
        ("pause", Some(key)) => Some(Command::Pause(key)),
        ("resume", Some(key)) => Some(Command::Resume(key)),
        ("toggle", Some(key)) => Some(Command::Toggle(key)),
        ("quit" | "exit", None) => Some(Command::Quit),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&path).context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config);

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        series = config.series.len(),
        "Starting ticker poller"
    );

    // ── 3. Start one poller per series ──────────────────────
    let chains = ConfiguredChains::new(&config)?;
    let supervisor = Arc::new(
        PollSupervisor::start(
            config.polling.settings(),
            ConfiguredChains::keys(&config),
            |key| chains.chain_for(key),
        )
        .context("Failed to start poll supervisor")?,
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let health = HealthState::new(supervisor.metrics());

    // ── 4. Health/metrics server ────────────────────────────
    let health_handle = if config.metrics.enabled {
        let server = HealthServer::new(health.clone(), config.metrics.bind_address.clone());
        let rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }))
    } else {
        None
    };

    // ── 5. Console renderer + command reader ────────────────
    let render_handle = tokio::spawn(render_loop(
        Arc::clone(&supervisor),
        Duration::from_secs_f64(config.polling.render_interval_secs),
        shutdown_tx.subscribe(),
    ));
    let mut commands = spawn_command_reader();

    info!("All tasks spawned — polling");

    // ── 6. Apply commands until Ctrl-C or quit ──────────────
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("SIGINT received, initiating graceful shutdown");
                break;
            }
            command = commands.recv() => match command {
                Some(Command::Pause(key)) => supervisor.pause(&key),
                Some(Command::Resume(key)) => supervisor.resume(&key),
                Some(Command::Toggle(key)) => {
                    if supervisor.toggle(&key).is_none() {
                        warn!(series = %key, "Unknown series");
                    }
                }
                Some(Command::Quit) => {
                    info!("Quit requested, initiating graceful shutdown");
                    break;
                }
                // Stdin closed; keep polling until Ctrl-C.
                None => {
                    signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
                    info!("SIGINT received, initiating graceful shutdown");
                    break;
                }
            },
        }
    }

    health.polling.store(false, Ordering::Relaxed);
    let report = supervisor.shutdown().await;
    if report.aborted > 0 || report.failed > 0 {
        warn!(
            aborted = report.aborted,
            failed = report.failed,
            "Some pollers did not stop cleanly"
        );
    }

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(2), render_handle).await;
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level));

    match config.app.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).pretty().init(),
    }
}

/// Log the newest sample of every series on a fixed cadence.
async fn render_loop(
    supervisor: Arc<PollSupervisor>,
    every: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => return,
            _ = ticker.tick() => {}
        }

        for key in supervisor.keys() {
            let samples = supervisor.snapshot(key);
            match samples.last() {
                Some(latest) => info!(
                    series = %key,
                    value = latest.value,
                    at = %latest.timestamp,
                    points = samples.len(),
                    paused = supervisor.is_paused(key).unwrap_or_default(),
                    "Latest"
                ),
                None => info!(series = %key, state = ?supervisor.state(key), "No data yet"),
            }
        }
    }
}

/// Read operator commands from stdin on a plain thread.
///
/// Must not be a runtime blocking task: runtime shutdown waits for
/// those, and a parked stdin read never returns on its own.
fn spawn_command_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { return };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(command) => {
                    if tx.blocking_send(command).is_err() {
                        return;
                    }
                }
                None => warn!(
                    input = %line.trim(),
                    "Unrecognized command (pause|resume|toggle <key>, quit)"
                ),
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("pause BTCUSDT"), Some(Command::Pause(SeriesKey::new("BTCUSDT"))));
        assert_eq!(parse_command("  Resume ETHUSDT "), Some(Command::Resume(SeriesKey::new("ETHUSDT"))));
        assert_eq!(parse_command("toggle USD/EUR"), Some(Command::Toggle(SeriesKey::new("USD/EUR"))));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("pause"), None);
        assert_eq!(parse_command("dance BTCUSDT"), None);
    }
}
