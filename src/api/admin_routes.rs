//! Token issuance and API-key administration

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::AuthStore;

use super::auth::{
    create_access_token, generate_api_key, require_admin, verify_password,
};
use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// POST /api/auth/token
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .auth
        .get_user_by_email(&request.email)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::Auth("Incorrect email or password".into()))?;

    if !user.is_active || !verify_password(&request.password, &user.hashed_password) {
        return Err(ApiError::Auth("Incorrect email or password".into()));
    }

    let access_token = create_access_token(
        &state.secret_key,
        &user.email,
        user.is_admin,
        state.token_ttl_minutes,
    )?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: i64,
    pub key_value: String,
    pub name: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// POST /api/admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    require_admin(&state, &headers)?;

    let key_value = generate_api_key();
    let api_key = state
        .auth
        .create_api_key(&key_value, &request.name, request.expires_at)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Created API key '{}'", api_key.name);
    Ok(Json(ApiKeyResponse {
        id: api_key.id,
        key_value: api_key.key_value,
        name: api_key.name,
        is_active: api_key.is_active,
        expires_at: api_key.expires_at,
        created_at: api_key.created_at,
    }))
}

/// GET /api/admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiKeyResponse>>, ApiError> {
    require_admin(&state, &headers)?;

    let keys = state
        .auth
        .list_api_keys()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(
        keys.into_iter()
            .map(|k| ApiKeyResponse {
                id: k.id,
                key_value: k.key_value,
                name: k.name,
                is_active: k.is_active,
                expires_at: k.expires_at,
                created_at: k.created_at,
            })
            .collect(),
    ))
}

/// DELETE /api/admin/api-keys/{id}
pub async fn deactivate_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;

    let deactivated = state
        .auth
        .deactivate_api_key(id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !deactivated {
        return Err(ApiError::NotFound(format!("API key {} not found", id)));
    }
    Ok(Json(serde_json::json!({ "deactivated": id })))
}
