use std::time::Duration;

use anyhow::anyhow;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::sync::{SYNC_KEY_HEADER, SyncResponse, SyncStatusResponse, SyncUsersRequest};
use crate::types::DirectoryUserRecord;

/// Error body of the sync endpoint.
#[derive(Debug, Deserialize)]
struct SyncErrorBody {
    error: Option<String>,
    details: Option<String>,
}

/// HTTP client for one tenant's sync endpoint.
#[derive(Clone)]
pub struct SyncClient {
    client: Client,
    endpoint: String,
    api_key: String,
    status_timeout: Duration,
}

impl SyncClient {
    pub fn new(
        base_url: &str,
        tenant_id: &str,
        api_key: &str,
        request_timeout: Duration,
        status_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/api/v1/tenants/{tenant_id}/sync/users",
                base_url.trim_end_matches('/')
            ),
            api_key: api_key.to_string(),
            status_timeout,
        })
    }

    /// Sends the whole batch in one request.
    pub async fn push(&self, users: &[DirectoryUserRecord]) -> anyhow::Result<SyncResponse> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(SYNC_KEY_HEADER, &self.api_key)
            .json(&SyncUsersRequest { users })
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    /// Checks the key without syncing anything.
    pub async fn status(&self) -> anyhow::Result<SyncStatusResponse> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header(SYNC_KEY_HEADER, &self.api_key)
            .timeout(self.status_timeout)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(resp: Response) -> anyhow::Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let message = match resp.json::<SyncErrorBody>().await {
            Ok(SyncErrorBody {
                error: Some(error),
                details: Some(details),
            }) => format!("{error}: {details}"),
            Ok(SyncErrorBody {
                error: Some(error), ..
            }) => error,
            _ => "Server error (no details provided)".to_string(),
        };
        Err(anyhow!("sync request failed ({status}): {message}"))
    }
}
