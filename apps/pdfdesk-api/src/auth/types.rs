//! Request and response bodies for the auth routes

use serde::{Deserialize, Serialize};
use shared_types::User;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

impl TokenResponse {
    pub fn bearer(access_token: String, lifetime_minutes: i64, user: User) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            expires_in: lifetime_minutes * 60,
            user,
        }
    }
}
