use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenValidationError, extract_bearer_token, validate_token};
use crate::server::AppState;
use crate::types::{PlatformUser, Role};

/// Who is making an operator request.
#[derive(Debug, Clone)]
pub enum Caller {
    /// The bootstrap admin token, or any user with the `admin` role.
    PlatformAdmin { token_id: String },
    User(PlatformUser),
}

impl Caller {
    /// Platform admins manage every tenant; tenant admins only their own.
    #[must_use]
    pub fn can_manage_tenant(&self, tenant_id: &str) -> bool {
        match self {
            Caller::PlatformAdmin { .. } => true,
            Caller::User(user) => user.role == Role::TenantAdmin && user.tenant_id == tenant_id,
        }
    }
}

/// Extractor that requires a valid operator token.
pub struct RequireAuth(pub Caller);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Bearer realm=\"onpoints\""),
            );
        }

        response
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(e: TokenValidationError) -> Self {
        match e {
            TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
            TokenValidationError::InvalidToken => AuthError::InvalidToken,
            TokenValidationError::TokenExpired => AuthError::TokenExpired,
            TokenValidationError::InternalError => AuthError::InternalError,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = extract_bearer_token(auth_header)?.ok_or(AuthError::MissingAuth)?;
        let caller = validate_token(state, raw_token)?;

        Ok(RequireAuth(caller))
    }
}
