//! The directory sync protocol endpoint. Authenticated by the tenant's sync
//! key rather than an operator token, and shaped the way agents expect:
//! `{success, ...}` bodies instead of the `{data, error}` envelope.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::error::Error;
use crate::server::AppState;
use crate::sync::{SYNC_KEY_HEADER, SyncUsersEnvelope};
use crate::types::Tenant;

const UNAUTHORIZED_MESSAGE: &str = "Invalid API key or sync is disabled";

/// Default cap on a push body. The agent sends the whole directory in one
/// request, so this sits well above axum's 2 MB default.
pub const DEFAULT_SYNC_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Sync routes, accepting push bodies of up to `body_limit` bytes.
pub fn sync_router(body_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}/sync/users", get(sync_status).post(push_users))
        .layer(DefaultBodyLimit::max(body_limit))
}

#[derive(Debug)]
enum SyncError {
    Unauthorized,
    InvalidEnvelope(String),
    PayloadTooLarge,
    Internal,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            SyncError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "error": UNAUTHORIZED_MESSAGE }),
            ),
            SyncError::InvalidEnvelope(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Invalid request body", "details": details }),
            ),
            SyncError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "success": false, "error": "Request body too large" }),
            ),
            SyncError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": "Internal server error" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<Error> for SyncError {
    fn from(e: Error) -> Self {
        match e {
            Error::Unauthorized => SyncError::Unauthorized,
            other => {
                tracing::error!("Sync request failed: {other}");
                SyncError::Internal
            }
        }
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap, tenant_id: &str) -> Result<Tenant, SyncError> {
    let presented = headers.get(SYNC_KEY_HEADER).and_then(|v| v.to_str().ok());
    state.sync.authenticate(tenant_id, presented).map_err(|e| {
        if matches!(e, Error::Unauthorized) {
            tracing::warn!("Rejected sync request for tenant {tenant_id}");
        }
        SyncError::from(e)
    })
}

async fn push_users(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<SyncUsersEnvelope>, JsonRejection>,
) -> Result<impl IntoResponse, SyncError> {
    let tenant = authenticate(&state, &headers, &id)?;
    let Json(envelope) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            tracing::warn!("Sync push for tenant {id} exceeded the body limit");
            SyncError::PayloadTooLarge
        } else {
            SyncError::InvalidEnvelope(e.body_text())
        }
    })?;

    Ok(Json(state.sync.push(&tenant, &envelope.users)))
}

async fn sync_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, SyncError> {
    let tenant = authenticate(&state, &headers, &id)?;
    Ok(Json(state.sync.status(&tenant)?))
}
