//! Authentication for the PDF API
//!
//! - Argon2id password hashing
//! - HS256 access tokens carrying the user's email
//! - `AuthUser` extractor plus an explicit `authorize` role check
//!
//! Routes:
//! - POST /auth/register -> handlers::register
//! - POST /auth/login -> handlers::login

pub mod extract;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod types;

use thiserror::Error;

pub use extract::{authorize, AuthUser};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token format")]
    MalformedToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("Access token expired")]
    Expired,

    #[error("Invalid token type")]
    WrongTokenType,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),
}
