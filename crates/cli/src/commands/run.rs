//! `run` command implementation.

use std::time::Duration;

use acquisition::MockBehavior;
use anyhow::{Context, Result};
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::pipeline::{Monitor, MonitorConfig};

/// Execute the `run` command
pub async fn run_acquisition(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let config = load_config(&args.config)?;
    info!(devices = config.devices.len(), "Configuration loaded");

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    let monitor = Monitor::new(MonitorConfig {
        acquisition: config,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        poll_interval: Duration::from_millis(args.poll_ms),
        behavior: MockBehavior {
            redeliver_every: (args.redeliver_every > 0).then_some(args.redeliver_every),
            ..MockBehavior::default()
        },
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    let stats = monitor
        .run(shutdown_signal())
        .await
        .context("Acquisition run failed")?;

    info!(
        items_added = stats.items_added(),
        items_read = stats.items_read(),
        duration_secs = stats.duration.as_secs_f64(),
        "Acquisition finished"
    );
    stats.print_summary();
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed never
/// fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
