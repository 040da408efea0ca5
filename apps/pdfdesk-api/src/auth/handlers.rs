//! Registration and login

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use shared_types::{Role, User};

use super::jwt::generate_access_token;
use super::password::{hash_password, validate_email, validate_password, verify_password};
use super::types::{LoginRequest, RegisterRequest, TokenResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::{is_unique_violation, NewUser};

fn issue_token(state: &AppState, user: User) -> Result<TokenResponse, ApiError> {
    let token = generate_access_token(
        &user.email,
        state.config.access_token_minutes,
        &state.config.jwt_secret,
    )
    .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(TokenResponse::bearer(
        token,
        state.config.access_token_minutes,
        user,
    ))
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_email(&req.email).map_err(ApiError::BadRequest)?;
    validate_password(&req.password).map_err(ApiError::BadRequest)?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .map_err(|e| ApiError::Internal(e.into()))?;

    let user = state
        .users
        .create(NewUser {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email,
            password_hash,
            role: Role::User,
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Email already registered".into())
            } else {
                ApiError::Database(e)
            }
        })?;

    tracing::info!(user_id = user.id, "Registered user {}", user.email);
    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Incorrect email or password".into());

    let row = state.users.find_by_email(&req.email).await?.ok_or_else(invalid)?;

    let password = req.password;
    let hash = row.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    if !valid {
        tracing::debug!(user_id = row.id, "Rejected login");
        return Err(invalid());
    }
    if !row.enabled {
        return Err(ApiError::BadRequest("Inactive user".into()));
    }

    Ok(Json(issue_token(&state, row.to_user())?))
}
