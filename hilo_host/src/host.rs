//! Host lifecycle: bind, spawn the table and the HTTP server, stop both.

use std::{future::Future, net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use hilo::{
    TableActor, TableHandle,
    round::Dealer,
    table::TableError,
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

use crate::{
    api::{self, AppState},
    config::HostConfig,
    metrics,
};

/// How often table counters are published to metrics.
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// A running host.
#[derive(Debug)]
pub struct HostServer {
    local_addr: SocketAddr,
    table: TableHandle,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<std::io::Result<()>>,
    stats: JoinHandle<()>,
}

impl HostServer {
    /// Validate `config`, bind, and start serving with a shuffling dealer.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when the address cannot be bound.
    pub async fn start(config: HostConfig) -> Result<Self> {
        config.validate()?;
        let (actor, table) = TableActor::new(config.table_config());
        Self::launch(&config, actor, table).await
    }

    /// Like [`HostServer::start`], dealing from `dealer`.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when the address cannot be bound.
    pub async fn start_with_dealer(
        config: HostConfig,
        dealer: impl Dealer + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let (actor, table) = TableActor::with_dealer(config.table_config(), dealer);
        Self::launch(&config, actor, table).await
    }

    async fn launch(config: &HostConfig, actor: TableActor, table: TableHandle) -> Result<Self> {
        let listener = TcpListener::bind(config.bind)
            .await
            .with_context(|| format!("Failed to bind to {}", config.bind))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read bound address")?;

        tokio::spawn(actor.run());

        let app = api::create_router(AppState {
            table: table.clone(),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let stats = tokio::spawn(publish_stats(table.clone()));

        tracing::info!(
            addr = %local_addr,
            tick_ms = config.tick_interval.as_millis() as u64,
            finish_timeout_ms = config.finish_timeout_ms,
            tie_enabled = config.tie_enabled,
            "Host listening"
        );

        Ok(Self {
            local_addr,
            table,
            shutdown: Some(shutdown_tx),
            server,
            stats,
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle to the table actor.
    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    /// Serve until `signal` resolves, then stop.
    ///
    /// # Errors
    ///
    /// Propagates server failures.
    pub async fn run_until(self, signal: impl Future<Output = ()>) -> Result<()> {
        signal.await;
        self.stop().await
    }

    /// Stop accepting connections and close the table. Closing the table
    /// ends every subscriber stream, so open WebSocket connections finish.
    ///
    /// # Errors
    ///
    /// Propagates server failures.
    pub async fn stop(mut self) -> Result<()> {
        tracing::info!(addr = %self.local_addr, "Host stopping");
        if let Err(TableError::Closed) = self.table.close().await {
            tracing::debug!("Table was already closed");
        }
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.stats.abort();
        self.server
            .await
            .context("Server task failed")?
            .context("Server error")?;
        tracing::info!("Host stopped");
        Ok(())
    }
}

async fn publish_stats(table: TableHandle) {
    let mut interval = tokio::time::interval(STATS_INTERVAL);
    loop {
        interval.tick().await;
        match table.stats().await {
            Ok(stats) => metrics::table_stats(&stats),
            Err(_) => break,
        }
    }
}
