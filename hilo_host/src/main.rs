//! Hi-Lo host: one table, served over HTTP and WebSocket.

use anyhow::{Context, Error};
use hilo_host::{ConfigOverrides, HostConfig, HostServer, logging, metrics};
use pico_args::Arguments;

const HELP: &str = "\
Run the Hi-Lo table host

USAGE:
  hilo_host [OPTIONS]

OPTIONS:
  --bind               IP:PORT   Server bind address             [default: env HILO_BIND or 0.0.0.0:8080]
  --tick-ms            MS        Finish-timeout check interval   [default: env HILO_TICK_MS or 500]
  --finish-timeout-ms  MS        Time a finished round stays up  [default: env HILO_FINISH_TIMEOUT_MS or 10000]
  --metrics-bind       IP:PORT   Prometheus exporter address     [default: env HILO_METRICS_BIND, disabled]

FLAGS:
  --tie                          Offer TIE as a third side       [default: env HILO_TIE_ENABLED or false]
  -h, --help                     Print help information

ENVIRONMENT:
  HILO_SUBSCRIBER_BUFFER         Per-connection state queue      [default: 32]
  RUST_LOG                       Log filter                      [default: info]
  (A .env file in the working directory is loaded first)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = ConfigOverrides {
        bind: pargs.opt_value_from_str("--bind")?,
        tick_ms: pargs.opt_value_from_str("--tick-ms")?,
        finish_timeout_ms: pargs.opt_value_from_str("--finish-timeout-ms")?,
        tie_enabled: pargs.contains("--tie"),
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}\n\n{HELP}");
    }

    logging::init();

    let config = HostConfig::from_env(overrides).context("Invalid configuration")?;
    config.validate().context("Invalid configuration")?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        tracing::info!(addr = %addr, "Metrics exporter listening");
    }

    let host = HostServer::start(config).await?;
    tracing::info!(
        "Host is running at http://{}. Press Ctrl+C to stop.",
        host.local_addr()
    );

    host.run_until(shutdown_signal()).await
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down host...");
}
