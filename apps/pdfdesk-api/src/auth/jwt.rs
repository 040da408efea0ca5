//! JWT access tokens
//!
//! HS256 signed with the configured secret. The subject is the user's email;
//! the `type` claim must be `access`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT Header for HS256
#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User email
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

fn sign(signing_input: &str, secret: &str) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

fn encode_jwt<T: Serialize>(claims: &T, secret: &str) -> Result<String, AuthError> {
    let header_json = serde_json::to_string(&JwtHeader::default())
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    let payload_json =
        serde_json::to_string(claims).map_err(|e| AuthError::Signing(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json.as_bytes()),
        URL_SAFE_NO_PAD.encode(payload_json.as_bytes())
    );
    let signature = sign(&signing_input, secret)?.finalize().into_bytes();

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

fn decode_jwt<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken);
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::MalformedToken)?;
    sign(&format!("{}.{}", header_b64, payload_b64), secret)?
        .verify_slice(&signature)
        .map_err(|_| AuthError::InvalidSignature)?;

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| AuthError::MalformedToken)?;
    let header: JwtHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::MalformedToken)?;
    if header.alg != "HS256" {
        return Err(AuthError::UnsupportedAlgorithm);
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::MalformedToken)
}

/// Issue an access token for `email` valid for `lifetime_minutes`
pub fn generate_access_token(
    email: &str,
    lifetime_minutes: i64,
    secret: &str,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: email.to_string(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
        iat: now,
        exp: now + lifetime_minutes * 60,
    };
    encode_jwt(&claims, secret)
}

/// Check signature, algorithm, expiry and token type
pub fn validate_access_token(token: &str, secret: &str) -> Result<AccessTokenClaims, AuthError> {
    let claims: AccessTokenClaims = decode_jwt(token, secret)?;

    if claims.exp < Utc::now().timestamp() {
        return Err(AuthError::Expired);
    }
    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(AuthError::WrongTokenType);
    }

    Ok(claims)
}

/// Extract Bearer token from an Authorization header value
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
