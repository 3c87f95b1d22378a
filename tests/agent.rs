//! The sync agent end to end: a fixed directory pushed through the real
//! HTTP client into an in-process server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use common::TestServer;
use onpoints::agent::{DirectoryEntry, DirectorySource, SyncAgent, SyncClient};
use onpoints::store::Store;

struct FixedDirectory(Vec<DirectoryEntry>);

#[async_trait]
impl DirectorySource for FixedDirectory {
    async fn fetch_entries(&self) -> anyhow::Result<Vec<DirectoryEntry>> {
        Ok(self.0.clone())
    }
}

struct BrokenDirectory;

#[async_trait]
impl DirectorySource for BrokenDirectory {
    async fn fetch_entries(&self) -> anyhow::Result<Vec<DirectoryEntry>> {
        anyhow::bail!("connection refused")
    }
}

fn directory() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry::new("CN=Alice,OU=Staff,DC=corp")
            .with("sAMAccountName", &["alice"])
            .with("mail", &["alice@corp.example.com"])
            .with("displayName", &["Alice Smith"])
            .with("memberOf", &["CN=Helpdesk,OU=Groups,DC=corp"])
            .with("department", &["IT"]),
        DirectoryEntry::new("CN=Bob,OU=Staff,DC=corp")
            .with("userPrincipalName", &["bob@corp.example.com"])
            .with("givenName", &["Bob"])
            .with("sn", &["Jones"]),
        DirectoryEntry::new("CN=Kiosk,OU=Devices,DC=corp").with("sAMAccountName", &["kiosk01"]),
    ]
}

async fn issue_key(server: &TestServer, tenant_id: &str) -> String {
    let body: Value = Client::new()
        .post(server.url(&format!("/api/v1/tenants/{tenant_id}/sync/api-key")))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"]["api_key"].as_str().unwrap().to_string()
}

fn client(server: &TestServer, tenant_id: &str, key: &str) -> SyncClient {
    SyncClient::new(
        &server.base_url,
        tenant_id,
        key,
        Duration::from_secs(30),
        Duration::from_secs(10),
    )
    .unwrap()
}

#[tokio::test]
async fn test_agent_syncs_directory() {
    let server = TestServer::start().await;
    let tenant = server.create_tenant("Corp", "corp");
    let key = issue_key(&server, &tenant.id).await;

    let agent = SyncAgent::new(
        Arc::new(FixedDirectory(directory())),
        client(&server, &tenant.id, &key),
        Duration::from_secs(3600),
    );

    let status = agent.test_connection().await.unwrap();
    assert_eq!(status.tenant.id, tenant.id);
    assert_eq!(status.user_count, 0);

    let first = agent.run_once().await.unwrap();
    assert_eq!(first.results.created, 2);
    assert_eq!(first.results.updated, 0);
    assert!(first.results.errors.is_empty());

    let second = agent.run_once().await.unwrap();
    assert_eq!(second.results.created, 0);
    assert_eq!(second.results.updated, 2);

    let alice = server
        .store
        .get_user_by_email(&tenant.id, "alice@corp.example.com")
        .unwrap()
        .unwrap();
    assert_eq!(alice.name, "Alice Smith");
    assert_eq!(alice.directory_attributes["department"], "IT");
    assert_eq!(
        server.store.list_user_groups(&alice.id).unwrap(),
        vec!["Helpdesk"]
    );

    let bob = server
        .store
        .get_user_by_email(&tenant.id, "bob@corp.example.com")
        .unwrap()
        .unwrap();
    assert_eq!(bob.name, "Bob Jones");
}

#[tokio::test]
async fn test_agent_with_bad_key_fails() {
    let server = TestServer::start().await;
    let tenant = server.create_tenant("Corp", "corp");
    issue_key(&server, &tenant.id).await;

    let agent = SyncAgent::new(
        Arc::new(FixedDirectory(directory())),
        client(&server, &tenant.id, "ad-sync-not-the-key"),
        Duration::from_secs(3600),
    );

    let err = agent.test_connection().await.unwrap_err();
    assert!(format!("{err:#}").contains("Invalid API key or sync is disabled"));

    let err = agent.run_once().await.unwrap_err();
    assert!(err.to_string().contains("401"));
    assert_eq!(server.store.count_tenant_users(&tenant.id).unwrap(), 0);
}

#[tokio::test]
async fn test_directory_failure_fails_run() {
    let server = TestServer::start().await;
    let tenant = server.create_tenant("Corp", "corp");
    let key = issue_key(&server, &tenant.id).await;

    let agent = SyncAgent::new(
        Arc::new(BrokenDirectory),
        client(&server, &tenant.id, &key),
        Duration::from_secs(3600),
    );

    let err = agent.run_once().await.unwrap_err();
    assert!(format!("{err:#}").contains("connection refused"));
}
