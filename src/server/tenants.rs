//! Operator routes for a single tenant: the sync key and the subdomain claim.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use crate::auth::{Caller, RequireAuth};
use crate::server::AppState;
use crate::server::dto::{ClaimSubdomainRequest, SubdomainResponse, SyncKeyIssuedResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Tenant;

pub fn tenant_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/{id}/sync/api-key",
            get(sync_key_status)
                .post(generate_sync_key)
                .delete(revoke_sync_key),
        )
        .route(
            "/{id}/subdomain",
            get(get_subdomain).post(claim_subdomain).delete(release_subdomain),
        )
        .route("/{id}/subdomain/verify", put(verify_subdomain))
}

/// Loads the path tenant and checks the caller may manage it.
fn authorize(state: &AppState, caller: &Caller, tenant_id: &str) -> Result<Tenant, ApiError> {
    let tenant = state
        .store
        .get_tenant(tenant_id)
        .map_err(|_| ApiError::internal("Failed to load tenant"))?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    if !caller.can_manage_tenant(&tenant.id) {
        return Err(ApiError::forbidden(
            "Only platform admins or this tenant's admins can manage it",
        ));
    }

    Ok(tenant)
}

async fn sync_key_status(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = authorize(&state, &caller, &id)?;
    let status = state.credentials.status(&tenant.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(status)))
}

async fn generate_sync_key(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = authorize(&state, &caller, &id)?;
    let issued = state.credentials.generate(&tenant.id)?;

    let body = SyncKeyIssuedResponse {
        api_key: issued.into_secret(),
        message: "Store this key securely. It will be shown only once.",
    };

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(body))))
}

async fn revoke_sync_key(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = authorize(&state, &caller, &id)?;
    state.credentials.revoke(&tenant.id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn get_subdomain(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = authorize(&state, &caller, &id)?;
    let body = SubdomainResponse::from(tenant.subdomain_claim());
    Ok::<_, ApiError>(Json(ApiResponse::success(body)))
}

async fn claim_subdomain(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ClaimSubdomainRequest>,
) -> impl IntoResponse {
    let tenant = authorize(&state, &caller, &id)?;
    let claim = state.claims.claim(&tenant.id, &req.subdomain)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(SubdomainResponse::from(claim))))
}

async fn verify_subdomain(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = authorize(&state, &caller, &id)?;
    let result = state.claims.verify(&tenant.id).await?;
    Ok::<_, ApiError>(Json(ApiResponse::success(result)))
}

async fn release_subdomain(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = authorize(&state, &caller, &id)?;
    state.claims.release(&tenant.id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
