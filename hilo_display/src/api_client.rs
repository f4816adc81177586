//! HTTP client for the host's `/status` and `/cmd/*` routes.

use anyhow::{Context, Result};
use hilo::{Command, RoundState};

/// Polls and drives the host over plain HTTP.
#[derive(Debug, Clone)]
pub struct StatusClient {
    base_url: String,
    client: reqwest::Client,
}

impl StatusClient {
    /// `base_url` is `http://host:port`, without a trailing slash.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the current round
    pub async fn status(&self) -> Result<RoundState> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .context("Failed to fetch status")?;

        if !response.status().is_success() {
            anyhow::bail!("Status request failed: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse status response")
    }

    /// Apply `cmd` through its `/cmd/*` route and return the resulting round.
    /// A rejected command is not an error; the round simply comes back
    /// unchanged.
    pub async fn command(&self, cmd: &Command) -> Result<RoundState> {
        let (path, query) = command_route(cmd);
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to send {cmd}"))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            anyhow::bail!("{cmd} failed: {error_text}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response to {cmd}"))
    }
}

/// Route and query string for a command.
fn command_route(cmd: &Command) -> (&'static str, Vec<(&'static str, String)>) {
    match cmd {
        Command::Reset => ("/cmd/reset", Vec::new()),
        Command::Arm { table_id, box_id } => (
            "/cmd/arm",
            vec![("table", table_id.to_string()), ("box", box_id.to_string())],
        ),
        Command::BuyIn { amount } => ("/cmd/buyin", vec![("amount", amount.to_string())]),
        Command::Choose { side } => ("/cmd/choose", vec![("side", side.to_string())]),
        Command::Confirm => ("/cmd/confirm", Vec::new()),
    }
}
