//! Durable state for verifications, inputs, agent results, and UBO linkage
//!
//! The engine depends on the [`VerificationStore`] trait; the production
//! implementation is [`postgres::PgStore`], and [`memory::MemoryStore`]
//! backs tests and embedded use. Date-bearing payloads are normalized to
//! ISO-8601 strings at this boundary, not by the callers.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod memory;
pub mod postgres;
pub mod types;

pub use postgres::PgStore;
pub use types::{
    AgentReport, AgentResultRow, AgentStatus, ApiKey, Check, CheckStatus, ListFilter, UboLink,
    User, Verification, VerificationInput, VerificationKind, VerificationOutcome,
    VerificationStatus,
};

/// Durable state operations the workflow engine needs
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Insert a new verification row
    async fn create_verification(
        &self,
        verification_id: &str,
        user_id: Option<&str>,
        business_id: Option<&str>,
        status: VerificationStatus,
    ) -> Result<Verification>;

    /// Look up a verification by id
    async fn get_verification(&self, verification_id: &str) -> Result<Option<Verification>>;

    /// Update status (and optionally result/reason) of a verification.
    ///
    /// `completed_at` is set whenever the new status is terminal, on both
    /// `completed` and `failed`; it marks terminality, not success.
    async fn update_verification_status(
        &self,
        verification_id: &str,
        status: VerificationStatus,
        result: Option<VerificationOutcome>,
        reason: Option<&str>,
    ) -> Result<Option<Verification>>;

    /// Most recent verification for a user id
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<Verification>>;

    /// Most recent verification for a business id
    async fn latest_for_business(&self, business_id: &str) -> Result<Option<Verification>>;

    /// Paginated listing by kind with optional status filter; returns rows
    /// ordered by `created_at desc` plus the unpaginated total
    async fn list_verifications(
        &self,
        kind: VerificationKind,
        filter: &ListFilter,
    ) -> Result<(Vec<Verification>, i64)>;

    /// Append an input payload; the payload is date-normalized before persist
    async fn store_input(
        &self,
        verification_id: &str,
        data_type: &str,
        data: Value,
    ) -> Result<VerificationInput>;

    /// Inputs for a verification, optionally restricted to one data type
    async fn get_inputs(
        &self,
        verification_id: &str,
        data_type: Option<&str>,
    ) -> Result<Vec<VerificationInput>>;

    /// Append an agent result row
    async fn store_agent_result(
        &self,
        verification_id: &str,
        report: &AgentReport,
    ) -> Result<AgentResultRow>;

    /// All agent results for a verification in append order
    async fn get_agent_results(&self, verification_id: &str) -> Result<Vec<AgentResultRow>>;

    /// Record a parent-business → UBO-child link
    async fn store_ubo_link(
        &self,
        verification_id: &str,
        ubo_user_id: &str,
        ubo_verification_id: &str,
    ) -> Result<UboLink>;

    /// Links from a business verification to its UBO children
    async fn get_ubo_links(&self, verification_id: &str) -> Result<Vec<UboLink>>;
}

/// Credential storage behind the HTTP façade
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_api_key(
        &self,
        key_value: &str,
        name: &str,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<ApiKey>;

    async fn get_api_key(&self, key_value: &str) -> Result<Option<ApiKey>>;

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>>;

    async fn deactivate_api_key(&self, id: i64) -> Result<bool>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User>;
}
