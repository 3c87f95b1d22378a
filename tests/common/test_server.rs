use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use uuid::Uuid;

use onpoints::auth::TokenGenerator;
use onpoints::domain::{DnsLookupError, TxtResolver};
use onpoints::server::{AppState, DEFAULT_SYNC_BODY_LIMIT, create_router};
use onpoints::store::{SqliteStore, Store};
use onpoints::types::{PlatformUser, Role, Tenant};

/// TXT records the test publishes by hand instead of real DNS.
#[derive(Default)]
pub struct StaticTxtResolver {
    records: Mutex<HashMap<String, Vec<String>>>,
}

impl StaticTxtResolver {
    pub fn publish(&self, name: &str, value: &str) {
        self.records
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }
}

#[async_trait]
impl TxtResolver for StaticTxtResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsLookupError> {
        self.records
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| DnsLookupError::Resolve {
                name: name.to_string(),
                message: "NXDOMAIN".into(),
            })
    }
}

/// The full router served in-process on an ephemeral port, backed by a
/// throwaway SQLite database.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub admin_token: String,
    pub store: Arc<SqliteStore>,
    pub dns: Arc<StaticTxtResolver>,
    server: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_sync_body_limit(DEFAULT_SYNC_BODY_LIMIT).await
    }

    pub async fn start_with_sync_body_limit(sync_body_limit: usize) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(
            SqliteStore::new(temp_dir.path().join("onpoints.db")).expect("open database"),
        );
        store.initialize().expect("initialize schema");

        let issued = TokenGenerator::new()
            .issue(true, None, None)
            .expect("issue admin token");
        store.create_token(&issued.token).expect("store admin token");

        let dns = Arc::new(StaticTxtResolver::default());
        let state = Arc::new(
            AppState::new(store.clone(), dns.clone()).with_sync_body_limit(sync_body_limit),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, create_router(state))
                .await
                .expect("serve");
        });

        Self {
            temp_dir,
            base_url: format!("http://{addr}"),
            admin_token: issued.raw,
            store,
            dns,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn create_tenant(&self, name: &str, slug: &str) -> Tenant {
        let tenant = Tenant::new(Uuid::new_v4().to_string(), name.into(), slug.into());
        self.store.create_tenant(&tenant).expect("create tenant");
        tenant
    }

    /// Creates a user and returns a raw API token for it.
    pub fn create_user(&self, tenant_id: &str, email: &str, role: Role) -> String {
        let now = Utc::now();
        let user = PlatformUser {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            email: email.into(),
            name: email.into(),
            role,
            password_hash: String::new(),
            is_active: true,
            directory_attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).expect("create user");

        let issued = TokenGenerator::new()
            .issue(false, Some(user.id), None)
            .expect("issue user token");
        self.store.create_token(&issued.token).expect("store user token");
        issued.raw
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}
