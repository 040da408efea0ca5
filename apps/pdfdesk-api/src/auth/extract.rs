//! Resolve the bearer token to an active user and check roles

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use shared_types::{Role, User};

use super::jwt::{extract_bearer_token, validate_access_token};
use crate::error::ApiError;
use crate::state::AppState;

pub const ANY_ROLE: &[Role] = &[Role::User, Role::Admin];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// The authenticated, enabled caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || ApiError::Unauthorized("Could not validate credentials".into());

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = extract_bearer_token(header_value)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;

        let claims = validate_access_token(token, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            unauthorized()
        })?;

        let row = state
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(unauthorized)?;
        if !row.enabled {
            return Err(ApiError::BadRequest("Inactive user".into()));
        }

        Ok(AuthUser(row.to_user()))
    }
}

/// Allow the actor through only when it holds one of `roles`
pub fn authorize(actor: &User, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&actor.role) {
        Ok(())
    } else {
        tracing::debug!(user_id = actor.id, role = %actor.role, "Insufficient permissions");
        Err(ApiError::Forbidden("Insufficient permissions".into()))
    }
}
