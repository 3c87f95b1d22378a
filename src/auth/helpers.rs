use std::sync::Arc;

use chrono::Utc;

use super::middleware::Caller;
use super::{TokenGenerator, parse_token};
use crate::server::AppState;
use crate::types::Role;

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

/// Extracts the raw token from a `Bearer` authorization header.
/// `Ok(None)` means no header was sent at all.
pub fn extract_bearer_token(
    auth_header: Option<&str>,
) -> Result<Option<&str>, TokenValidationError> {
    match auth_header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .map(|t| Some(t.trim()))
            .ok_or(TokenValidationError::InvalidScheme),
        None => Ok(None),
    }
}

/// Validates a raw token against the store and resolves who is calling.
pub fn validate_token(
    state: &Arc<AppState>,
    raw_token: &str,
) -> Result<Caller, TokenValidationError> {
    let lookup = parse_token(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = state
        .store
        .get_token_by_lookup(lookup)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &token.token_hash)
        .map_err(|_| TokenValidationError::InternalError)?
    {
        return Err(TokenValidationError::InvalidToken);
    }

    if let Some(expires_at) = &token.expires_at {
        if expires_at < &Utc::now() {
            return Err(TokenValidationError::TokenExpired);
        }
    }

    if let Err(e) = state.store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    if token.is_admin {
        return Ok(Caller::PlatformAdmin { token_id: token.id });
    }

    let user_id = token
        .user_id
        .as_deref()
        .ok_or(TokenValidationError::InvalidToken)?;

    let user = state
        .store
        .get_user(user_id)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    if !user.is_active {
        return Err(TokenValidationError::InvalidToken);
    }

    Ok(match user.role {
        Role::Admin => Caller::PlatformAdmin { token_id: token.id },
        _ => Caller::User(user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token(Some("Bearer onpoints_x_y")).unwrap(),
            Some("onpoints_x_y")
        );
        assert_eq!(extract_bearer_token(None).unwrap(), None);
        assert!(matches!(
            extract_bearer_token(Some("Basic abc")),
            Err(TokenValidationError::InvalidScheme)
        ));
    }
}
