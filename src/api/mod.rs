//! HTTP façade
//!
//! A thin axum layer over the engine: submission, status, report, listing,
//! queue introspection, token issuance, and admin API-key management. All
//! verification work happens on the worker; handlers only validate, write
//! the initial row, and enqueue.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::EngineError;
use crate::queue::JobQueue;
use crate::store::{AuthStore, VerificationStore};
use crate::workflow::VerificationSubmitter;

pub mod admin_routes;
pub mod auth;
pub mod jobs_routes;
pub mod verify_routes;

/// Shared state for all routes
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VerificationStore>,
    pub auth: Arc<dyn AuthStore>,
    pub submitter: Arc<VerificationSubmitter>,
    pub queue: JobQueue,
    pub secret_key: String,
    pub token_ttl_minutes: i64,
}

/// Error envelope returned by every handler as `{"detail": …}`
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Auth(String),
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::Validation(detail)
            | Self::Auth(detail)
            | Self::NotFound(detail)
            | Self::BadRequest(detail)
            | Self::Internal(detail) => detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.detail() }));
        (self.status(), body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(detail) => Self::Validation(detail),
            EngineError::Auth(detail) => Self::Auth(detail),
            EngineError::NotFound(detail) => Self::NotFound(detail),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Assemble the full API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/verify/kyc", post(verify_routes::start_kyc_verification))
        .route(
            "/api/verify/business",
            post(verify_routes::start_business_verification),
        )
        .route(
            "/api/verify/status/:verification_id",
            get(verify_routes::get_verification_status),
        )
        .route("/api/verify/report", get(verify_routes::get_verification_report))
        .route("/api/verify/kyc/list", get(verify_routes::list_kyc_verifications))
        .route(
            "/api/verify/business/list",
            get(verify_routes::list_business_verifications),
        )
        .route("/api/job-status/:job_id", get(jobs_routes::get_job_status))
        .route("/api/queue-info", get(jobs_routes::get_queue_info))
        .route("/api/health", get(jobs_routes::health))
        .route("/api/auth/token", post(admin_routes::issue_token))
        .route(
            "/api/admin/api-keys",
            post(admin_routes::create_api_key).get(admin_routes::list_api_keys),
        )
        .route(
            "/api/admin/api-keys/:id",
            axum::routing::delete(admin_routes::deactivate_api_key),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
