//! Runnable relay server.
//!
//! ```text
//! RUST_LOG=info FOGRELAY_LISTEN=127.0.0.1:9837 cargo run -p relay-server
//! ```
//!
//! Ctrl-C prints the statistics; a second Ctrl-C within two seconds exits.
//! On Unix, `SIGUSR1` prints the statistics too.

mod config;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use fogrelay::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::RelayConfig;

const EXIT_WINDOW: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let server = RelayServer::builder()
        .config(config.server)
        .registry_config(config.registry)
        .build()
        .await
        .context("start relay server")?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    let stats = server.stats();
    tokio::spawn(log_stats_on_sigusr1(stats.clone()));

    tokio::select! {
        result = server.run() => result.context("relay server stopped")?,
        result = wait_for_double_ctrl_c(&stats) => result?,
    }
    tracing::info!("shutting down");
    Ok(())
}

/// Logs statistics on every Ctrl-C and returns on the second one within
/// [`EXIT_WINDOW`].
async fn wait_for_double_ctrl_c(stats: &StatsReporter) -> Result<()> {
    let mut last: Option<Instant> = None;
    loop {
        tokio::signal::ctrl_c().await.context("listen for ctrl-c")?;
        let now = Instant::now();
        if last.is_some_and(|at| now.duration_since(at) < EXIT_WINDOW) {
            return Ok(());
        }
        last = Some(now);
        tracing::info!(
            "press ctrl-c twice within {} seconds to exit",
            EXIT_WINDOW.as_secs()
        );
        log_stats(stats);
    }
}

fn log_stats(stats: &StatsReporter) {
    tracing::info!("statistics:\n\n{}\n", stats.summary().join("\n"));
}

#[cfg(unix)]
async fn log_stats_on_sigusr1(stats: StatsReporter) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = match signal(SignalKind::user_defined1()) {
        Ok(usr1) => usr1,
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGUSR1");
            return;
        }
    };
    while usr1.recv().await.is_some() {
        log_stats(&stats);
    }
}

#[cfg(not(unix))]
async fn log_stats_on_sigusr1(_stats: StatsReporter) {}
