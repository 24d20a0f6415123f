use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flood_control::config::{DemoConfig, FloodControlConfig};
use flood_control::{CheckContext, FloodControl, RateGate};

/// Drive a flood control gate with a burst of checks for one identifier.
#[derive(Parser, Debug)]
#[command(name = "flood-control", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Identifier to check
    #[arg(long)]
    user_id: Option<i64>,

    /// Number of checks to issue
    #[arg(long)]
    requests: Option<u32>,

    /// Pause between checks in milliseconds
    #[arg(long)]
    spacing_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting flood control driver");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = FloodControlConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(user_id) = cli.user_id {
        config.demo.user_id = user_id;
    }
    if let Some(requests) = cli.requests {
        config.demo.requests = requests;
    }
    if let Some(spacing_ms) = cli.spacing_ms {
        config.demo.spacing_ms = spacing_ms;
    }
    info!(
        window = ?config.gate.window,
        max_checks = config.gate.max_checks,
        "Configuration loaded"
    );

    let gate = Arc::new(RateGate::new(config.gate)?);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let reaper = if config.reaper.enabled {
        info!(
            interval_ms = config.reaper.interval_ms,
            idle_after_ms = config.reaper.idle_after_ms,
            "Starting idle identifier reaper"
        );
        Some(gate.clone().spawn_reaper(
            config.reaper.interval(),
            config.reaper.idle_after(),
            async move {
                let _ = shutdown_rx.changed().await;
            },
        ))
    } else {
        None
    };

    let outcome = tokio::select! {
        result = run_demo(gate.clone(), &config.demo) => result,
        _ = shutdown_signal() => Ok(()),
    };

    let _ = shutdown_tx.send(true);
    if let Some(reaper) = reaper {
        reaper.await.context("reaper task failed")?;
    }

    info!(identifiers = gate.identifier_count(), "Flood control driver stopped");
    outcome
}

/// Issue the configured burst of checks, one per spacing interval.
async fn run_demo(gate: Arc<dyn FloodControl>, demo: &DemoConfig) -> anyhow::Result<()> {
    let ctx = CheckContext::background();

    for request in 1..=demo.requests {
        let admitted = gate
            .check(&ctx, demo.user_id)
            .await
            .with_context(|| format!("check {} for user {} failed", request, demo.user_id))?;

        if admitted {
            info!(request, user_id = demo.user_id, "Request passed flood control check");
        } else {
            warn!(request, user_id = demo.user_id, "Request failed flood control check");
        }

        tokio::time::sleep(demo.spacing()).await;
    }

    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping early");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping early");
        }
    }
}
