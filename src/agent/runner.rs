use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use super::client::SyncClient;
use super::directory::{DirectorySource, normalize_entries};
use crate::sync::{SyncResponse, SyncStatusResponse};

/// Reads the directory and pushes it to the platform, once or on a schedule.
/// Each run starts from scratch; nothing is carried between runs.
pub struct SyncAgent {
    source: Arc<dyn DirectorySource>,
    client: SyncClient,
    interval: Duration,
}

impl SyncAgent {
    #[must_use]
    pub fn new(source: Arc<dyn DirectorySource>, client: SyncClient, interval: Duration) -> Self {
        Self {
            source,
            client,
            interval,
        }
    }

    pub async fn test_connection(&self) -> anyhow::Result<SyncStatusResponse> {
        let status = self
            .client
            .status()
            .await
            .context("platform connection test failed")?;
        tracing::info!(
            "Connected to platform as tenant {} ({}), {} users",
            status.tenant.name,
            status.tenant.id,
            status.user_count
        );
        Ok(status)
    }

    /// One full sync. Transport or auth failures fail the run; per-record
    /// errors reported by the platform are only logged.
    pub async fn run_once(&self) -> anyhow::Result<SyncResponse> {
        let entries = self
            .source
            .fetch_entries()
            .await
            .context("failed to read directory")?;
        let records = normalize_entries(&entries);
        tracing::info!(
            "Pushing {} users ({} directory entries)",
            records.len(),
            entries.len()
        );

        let response = self.client.push(&records).await?;
        tracing::info!("{}", response.message);
        for error in &response.results.errors {
            tracing::warn!("Platform rejected {}: {}", error.email, error.error);
        }

        Ok(response)
    }

    /// Tests the connection, then syncs every interval until Ctrl-C. A failed
    /// run is logged and retried on the next tick.
    pub async fn run_forever(&self) -> anyhow::Result<()> {
        self.test_connection().await?;

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!("Sync run failed: {e:#}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down sync agent");
                    return Ok(());
                }
            }
        }
    }
}
