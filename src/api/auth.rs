//! Credential handling for the façade
//!
//! API keys gate the verification endpoints; bearer tokens (HS256 JWTs)
//! gate the listing and admin endpoints. Passwords are stored as salted
//! SHA-256 digests in `salt$digest` form.

use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::store::AuthStore;

use super::{ApiError, AppState};

/// JWT claims carried by access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email
    pub sub: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
    pub is_admin: bool,
}

/// Generate a fresh opaque API key value
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("vk_{}", hex::encode(bytes))
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    format!("{}${}", salt, digest(&salt, password))
}

/// Check a password against a stored `salt$digest` hash
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issue an access token for a user
pub fn create_access_token(
    secret: &str,
    email: &str,
    is_admin: bool,
    ttl_minutes: i64,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: email.to_string(),
        exp: (Utc::now() + chrono::Duration::minutes(ttl_minutes)).timestamp(),
        is_admin,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Token creation failed: {}", e)))
}

/// Validate the `x-api-key` header against the credential store
pub async fn require_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let key_value = headers
        .get("x-api-key")
        .or_else(|| headers.get("api-key"))
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Auth("Missing API key".into()))?;

    let api_key = state
        .auth
        .get_api_key(key_value)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::Auth("Invalid API key".into()))?;

    if !api_key.is_active {
        return Err(ApiError::Auth("Invalid API key".into()));
    }
    if let Some(expires_at) = api_key.expires_at {
        if expires_at < Utc::now() {
            return Err(ApiError::Auth("Invalid API key".into()));
        }
    }
    Ok(())
}

/// Validate a bearer token and return its claims
pub fn require_bearer(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Auth("Missing bearer token".into()))?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Auth("Invalid or expired token".into()))
}

/// Validate a bearer token and require the admin flag
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let claims = require_bearer(state, headers)?;
    if !claims.is_admin {
        return Err(ApiError::Auth("Admin privileges required".into()));
    }
    Ok(claims)
}
