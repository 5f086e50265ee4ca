//! Verification endpoints

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::store::{
    ListFilter, Verification, VerificationKind, VerificationStatus, VerificationStore,
};
use crate::utils::validation::{validate_business_request, validate_kyc_request};

use super::auth::{require_api_key, require_bearer};
use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct KycVerificationRequest {
    pub user_id: String,
    #[serde(default)]
    pub additional_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct BusinessVerificationRequest {
    pub business_id: String,
    #[serde(default)]
    pub additional_data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub verification_id: String,
    pub status: String,
}

/// POST /api/verify/kyc
pub async fn start_kyc_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<KycVerificationRequest>,
) -> Result<Json<VerificationResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    validate_kyc_request(&request.user_id, request.additional_data.as_ref())?;

    info!("Starting KYC verification for user_id {}", request.user_id);
    let verification_id = state
        .submitter
        .submit_individual(&request.user_id, request.additional_data)
        .await?;

    Ok(Json(VerificationResponse {
        verification_id,
        status: "PENDING".to_string(),
    }))
}

/// POST /api/verify/business
pub async fn start_business_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BusinessVerificationRequest>,
) -> Result<Json<VerificationResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    validate_business_request(&request.business_id, request.additional_data.as_ref())?;

    info!(
        "Starting KYB verification for business_id {}",
        request.business_id
    );
    let verification_id = state
        .submitter
        .submit_business(&request.business_id, request.additional_data)
        .await?;

    Ok(Json(VerificationResponse {
        verification_id,
        status: "PENDING".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct VerificationStatusResponse {
    pub verification_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// GET /api/verify/status/{verification_id}
pub async fn get_verification_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(verification_id): Path<String>,
) -> Result<Json<VerificationStatusResponse>, ApiError> {
    require_api_key(&state, &headers).await?;

    let verification = state
        .store
        .get_verification(&verification_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Verification {} not found", verification_id))
        })?;

    Ok(Json(VerificationStatusResponse {
        verification_id,
        status: verification.status.as_str().to_string(),
        created_at: verification.created_at,
        updated_at: verification.updated_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub verification_id: Option<String>,
    pub user_id: Option<String>,
    pub business_id: Option<String>,
}

/// GET /api/verify/report
pub async fn get_verification_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, ApiError> {
    require_api_key(&state, &headers).await?;

    let verification = if let Some(verification_id) = &query.verification_id {
        state
            .store
            .get_verification(verification_id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Verification {} not found", verification_id))
            })?
    } else if let Some(business_id) = &query.business_id {
        state
            .store
            .latest_for_business(business_id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Verification for business {} not found", business_id))
            })?
    } else if let Some(user_id) = &query.user_id {
        state.store.latest_for_user(user_id).await?.ok_or_else(|| {
            ApiError::NotFound(format!("Verification for user {} not found", user_id))
        })?
    } else {
        return Err(ApiError::BadRequest(
            "Either business_id, user_id, or verification_id must be provided".into(),
        ));
    };

    let report = build_report(&state, &verification).await?;
    Ok(Json(report))
}

/// Full report: verification row, per-agent results, and (for a business)
/// the outcome of each UBO child
async fn build_report(state: &AppState, verification: &Verification) -> Result<Value, ApiError> {
    let results = state
        .store
        .get_agent_results(&verification.verification_id)
        .await?;

    let agent_results: Vec<Value> = results
        .iter()
        .map(|row| {
            json!({
                "agent_type": &row.report.agent_type,
                "status": row.report.status,
                "details": &row.report.details,
                "checks": &row.report.checks,
                "created_at": row.created_at,
            })
        })
        .collect();

    let mut report = json!({
        "verification_id": &verification.verification_id,
        "user_id": &verification.user_id,
        "business_id": &verification.business_id,
        "status": verification.status.as_str(),
        "result": verification.result.map(|r| r.as_str()),
        "reason": &verification.reason,
        "created_at": verification.created_at,
        "completed_at": verification.completed_at,
        "agent_results": agent_results,
    });

    if verification.kind() == VerificationKind::Business {
        let links = state
            .store
            .get_ubo_links(&verification.verification_id)
            .await?;
        let mut ubo_outcomes = Vec::new();
        for link in links {
            let child = state.store.get_verification(&link.ubo_verification_id).await?;
            ubo_outcomes.push(json!({
                "ubo_user_id": link.ubo_user_id,
                "verification_id": link.ubo_verification_id,
                "status": child.as_ref().map(|c| c.status.as_str()),
                "result": child.as_ref().and_then(|c| c.result).map(|r| r.as_str()),
            }));
        }
        report["ubo_verifications"] = json!(ubo_outcomes);
    }

    Ok(report)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<String>,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct VerificationSummary {
    pub verification_id: String,
    pub user_id: Option<String>,
    pub business_id: Option<String>,
    pub status: String,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct VerificationListResponse {
    pub items: Vec<VerificationSummary>,
    pub total: i64,
}

async fn list_verifications(
    state: &AppState,
    kind: VerificationKind,
    query: ListQuery,
) -> Result<Json<VerificationListResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<VerificationStatus>)
        .transpose()
        .map_err(ApiError::Validation)?;

    let filter = ListFilter {
        status,
        skip: query.skip,
        limit: query.limit,
    };
    let (verifications, total) = state.store.list_verifications(kind, &filter).await?;

    let items = verifications
        .into_iter()
        .map(|v| VerificationSummary {
            verification_id: v.verification_id,
            user_id: v.user_id,
            business_id: v.business_id,
            status: v.status.as_str().to_string(),
            result: v.result.map(|r| r.as_str().to_string()),
            created_at: v.created_at,
            completed_at: v.completed_at,
        })
        .collect();

    Ok(Json(VerificationListResponse { items, total }))
}

/// GET /api/verify/kyc/list
pub async fn list_kyc_verifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<VerificationListResponse>, ApiError> {
    require_bearer(&state, &headers)?;
    list_verifications(&state, VerificationKind::Individual, query).await
}

/// GET /api/verify/business/list
pub async fn list_business_verifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<VerificationListResponse>, ApiError> {
    require_bearer(&state, &headers)?;
    list_verifications(&state, VerificationKind::Business, query).await
}
