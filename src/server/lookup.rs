use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};

use crate::domain::RequestSignals;
use crate::server::AppState;
use crate::server::dto::TenantLookupResponse;
use crate::server::response::{ApiError, ApiResponse};

/// Which tenant owns this request, judged by the proxy headers and `Host`.
pub async fn current_tenant(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let signals = RequestSignals::from_headers(&headers);

    let tenant = state
        .resolver
        .resolve_tenant(&signals)
        .map_err(|_| ApiError::internal("Failed to resolve tenant"))?
        .ok_or_else(|| ApiError::not_found("No tenant for this domain"))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(TenantLookupResponse::from(
        tenant,
    ))))
}
