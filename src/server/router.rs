use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::lookup::current_tenant;
use super::sync::{DEFAULT_SYNC_BODY_LIMIT, sync_router};
use super::tenants::tenant_router;
use crate::domain::{DomainResolver, SubdomainClaimManager, TxtResolver};
use crate::store::Store;
use crate::sync::{DirectorySyncService, SyncCredentialManager};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub resolver: DomainResolver,
    pub claims: SubdomainClaimManager,
    pub credentials: SyncCredentialManager,
    pub sync: DirectorySyncService,
    /// Largest accepted sync push body, in bytes.
    pub sync_body_limit: usize,
}

impl AppState {
    /// Wires every service to one store. `txt` answers the DNS ownership
    /// challenges; tests pass an in-memory resolver here.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, txt: Arc<dyn TxtResolver>) -> Self {
        Self {
            resolver: DomainResolver::new(store.clone()),
            claims: SubdomainClaimManager::new(store.clone(), txt),
            credentials: SyncCredentialManager::new(store.clone()),
            sync: DirectorySyncService::new(store.clone()),
            store,
            sync_body_limit: DEFAULT_SYNC_BODY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_sync_body_limit(mut self, bytes: usize) -> Self {
        self.sync_body_limit = bytes;
        self
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let sync_body_limit = state.sync_body_limit;
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tenant", get(current_tenant))
        .nest("/api/v1/tenants", tenant_router())
        .nest("/api/v1/tenants", sync_router(sync_body_limit))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
