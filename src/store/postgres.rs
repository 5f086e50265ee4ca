//! PostgreSQL-backed verification store
//!
//! Runtime-checked `sqlx::query()` is used throughout instead of the
//! compile-time macros so the crate builds without a live database; the
//! schema is created on startup by [`PgStore::init_schema`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::info;

use crate::utils::normalize_dates;

use super::types::{
    AgentReport, AgentResultRow, ApiKey, Check, ListFilter, UboLink, User, Verification,
    VerificationInput, VerificationKind, VerificationOutcome, VerificationStatus,
};
use super::{AuthStore, VerificationStore};

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS verifications (
        id BIGSERIAL PRIMARY KEY,
        verification_id TEXT NOT NULL UNIQUE,
        user_id TEXT,
        business_id TEXT,
        status TEXT NOT NULL DEFAULT 'queued',
        result TEXT,
        reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        completed_at TIMESTAMPTZ,
        CHECK ((user_id IS NULL) <> (business_id IS NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_verifications_user ON verifications (user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_verifications_business ON verifications (business_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS verification_inputs (
        id BIGSERIAL PRIMARY KEY,
        verification_id TEXT NOT NULL REFERENCES verifications (verification_id),
        data_type TEXT NOT NULL,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_inputs_verification ON verification_inputs (verification_id)",
    r#"
    CREATE TABLE IF NOT EXISTS agent_results (
        id BIGSERIAL PRIMARY KEY,
        verification_id TEXT NOT NULL REFERENCES verifications (verification_id),
        agent_type TEXT NOT NULL,
        status TEXT NOT NULL,
        details TEXT,
        checks JSONB,
        extras JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_results_verification ON agent_results (verification_id, id)",
    r#"
    CREATE TABLE IF NOT EXISTS ubo_links (
        id BIGSERIAL PRIMARY KEY,
        verification_id TEXT NOT NULL REFERENCES verifications (verification_id),
        ubo_user_id TEXT NOT NULL,
        ubo_verification_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ubo_links_parent ON ubo_links (verification_id)",
    r#"
    CREATE TABLE IF NOT EXISTS api_keys (
        id BIGSERIAL PRIMARY KEY,
        key_value TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        expires_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// PostgreSQL store for all engine entities
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool and wrap it
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .context("Failed to connect to verification store")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create all tables and indexes if they do not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize verification schema")?;
        }
        info!("Verification store schema ready");
        Ok(())
    }

    fn row_to_verification(row: &PgRow) -> Result<Verification> {
        let status: String = row.get("status");
        let result: Option<String> = row.get("result");
        Ok(Verification {
            verification_id: row.get("verification_id"),
            user_id: row.get("user_id"),
            business_id: row.get("business_id"),
            status: status.parse().map_err(anyhow::Error::msg)?,
            result: result
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(anyhow::Error::msg)?,
            reason: row.get("reason"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            completed_at: row.get("completed_at"),
        })
    }

    fn row_to_agent_result(row: &PgRow) -> Result<AgentResultRow> {
        let status: String = row.get("status");
        let checks: Option<Value> = row.get("checks");
        let extras: Option<Value> = row.get("extras");
        let checks: Vec<Check> = checks
            .map(serde_json::from_value)
            .transpose()
            .context("Malformed checks payload in agent_results row")?
            .unwrap_or_default();
        let extras = match extras {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        Ok(AgentResultRow {
            id: row.get("id"),
            verification_id: row.get("verification_id"),
            report: AgentReport {
                agent_type: row.get("agent_type"),
                status: status.parse().map_err(anyhow::Error::msg)?,
                details: row.get::<Option<String>, _>("details").unwrap_or_default(),
                checks,
                extras,
            },
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl VerificationStore for PgStore {
    async fn create_verification(
        &self,
        verification_id: &str,
        user_id: Option<&str>,
        business_id: Option<&str>,
        status: VerificationStatus,
    ) -> Result<Verification> {
        let row = sqlx::query(
            r#"
            INSERT INTO verifications (verification_id, user_id, business_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING verification_id, user_id, business_id, status, result, reason,
                      created_at, updated_at, completed_at
            "#,
        )
        .bind(verification_id)
        .bind(user_id)
        .bind(business_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create verification")?;

        Self::row_to_verification(&row)
    }

    async fn get_verification(&self, verification_id: &str) -> Result<Option<Verification>> {
        let row = sqlx::query(
            r#"
            SELECT verification_id, user_id, business_id, status, result, reason,
                   created_at, updated_at, completed_at
            FROM verifications
            WHERE verification_id = $1
            "#,
        )
        .bind(verification_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load verification")?;

        row.as_ref().map(Self::row_to_verification).transpose()
    }

    async fn update_verification_status(
        &self,
        verification_id: &str,
        status: VerificationStatus,
        result: Option<VerificationOutcome>,
        reason: Option<&str>,
    ) -> Result<Option<Verification>> {
        let row = sqlx::query(
            r#"
            UPDATE verifications
            SET status = $2,
                result = COALESCE($3, result),
                reason = COALESCE($4, reason),
                updated_at = NOW(),
                completed_at = CASE WHEN $5 THEN NOW() ELSE completed_at END
            WHERE verification_id = $1
            RETURNING verification_id, user_id, business_id, status, result, reason,
                      created_at, updated_at, completed_at
            "#,
        )
        .bind(verification_id)
        .bind(status.as_str())
        .bind(result.map(|r| r.as_str()))
        .bind(reason)
        .bind(status.is_terminal())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update verification status")?;

        row.as_ref().map(Self::row_to_verification).transpose()
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<Verification>> {
        let row = sqlx::query(
            r#"
            SELECT verification_id, user_id, business_id, status, result, reason,
                   created_at, updated_at, completed_at
            FROM verifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load latest user verification")?;

        row.as_ref().map(Self::row_to_verification).transpose()
    }

    async fn latest_for_business(&self, business_id: &str) -> Result<Option<Verification>> {
        let row = sqlx::query(
            r#"
            SELECT verification_id, user_id, business_id, status, result, reason,
                   created_at, updated_at, completed_at
            FROM verifications
            WHERE business_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load latest business verification")?;

        row.as_ref().map(Self::row_to_verification).transpose()
    }

    async fn list_verifications(
        &self,
        kind: VerificationKind,
        filter: &ListFilter,
    ) -> Result<(Vec<Verification>, i64)> {
        let subject_clause = match kind {
            VerificationKind::Individual => "user_id IS NOT NULL",
            VerificationKind::Business => "business_id IS NOT NULL",
        };

        let list_sql = format!(
            r#"
            SELECT verification_id, user_id, business_id, status, result, reason,
                   created_at, updated_at, completed_at
            FROM verifications
            WHERE {subject_clause} AND ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#
        );
        let count_sql = format!(
            "SELECT COUNT(*) AS total FROM verifications WHERE {subject_clause} AND ($1::TEXT IS NULL OR status = $1)"
        );

        let status_filter = filter.status.map(|s| s.as_str());

        let rows = sqlx::query(&list_sql)
            .bind(status_filter)
            .bind(filter.skip)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list verifications")?;

        let total_row = sqlx::query(&count_sql)
            .bind(status_filter)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count verifications")?;
        let total: i64 = total_row.get("total");

        let verifications = rows
            .iter()
            .map(Self::row_to_verification)
            .collect::<Result<Vec<_>>>()?;

        Ok((verifications, total))
    }

    async fn store_input(
        &self,
        verification_id: &str,
        data_type: &str,
        mut data: Value,
    ) -> Result<VerificationInput> {
        normalize_dates(&mut data);

        let row = sqlx::query(
            r#"
            INSERT INTO verification_inputs (verification_id, data_type, data)
            VALUES ($1, $2, $3)
            RETURNING id, verification_id, data_type, data, created_at
            "#,
        )
        .bind(verification_id)
        .bind(data_type)
        .bind(&data)
        .fetch_one(&self.pool)
        .await
        .context("Failed to store verification input")?;

        Ok(VerificationInput {
            id: row.get("id"),
            verification_id: row.get("verification_id"),
            data_type: row.get("data_type"),
            data: row.get("data"),
            created_at: row.get("created_at"),
        })
    }

    async fn get_inputs(
        &self,
        verification_id: &str,
        data_type: Option<&str>,
    ) -> Result<Vec<VerificationInput>> {
        let rows = sqlx::query(
            r#"
            SELECT id, verification_id, data_type, data, created_at
            FROM verification_inputs
            WHERE verification_id = $1 AND ($2::TEXT IS NULL OR data_type = $2)
            ORDER BY id
            "#,
        )
        .bind(verification_id)
        .bind(data_type)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load verification inputs")?;

        Ok(rows
            .into_iter()
            .map(|row| VerificationInput {
                id: row.get("id"),
                verification_id: row.get("verification_id"),
                data_type: row.get("data_type"),
                data: row.get("data"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn store_agent_result(
        &self,
        verification_id: &str,
        report: &AgentReport,
    ) -> Result<AgentResultRow> {
        let checks = serde_json::to_value(&report.checks)?;
        let extras = Value::Object(report.extras.clone());

        let row = sqlx::query(
            r#"
            INSERT INTO agent_results (verification_id, agent_type, status, details, checks, extras)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, verification_id, agent_type, status, details, checks, extras, created_at
            "#,
        )
        .bind(verification_id)
        .bind(&report.agent_type)
        .bind(report.status.as_str())
        .bind(&report.details)
        .bind(&checks)
        .bind(&extras)
        .fetch_one(&self.pool)
        .await
        .context("Failed to store agent result")?;

        Self::row_to_agent_result(&row)
    }

    async fn get_agent_results(&self, verification_id: &str) -> Result<Vec<AgentResultRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, verification_id, agent_type, status, details, checks, extras, created_at
            FROM agent_results
            WHERE verification_id = $1
            ORDER BY id
            "#,
        )
        .bind(verification_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load agent results")?;

        rows.iter().map(Self::row_to_agent_result).collect()
    }

    async fn store_ubo_link(
        &self,
        verification_id: &str,
        ubo_user_id: &str,
        ubo_verification_id: &str,
    ) -> Result<UboLink> {
        let row = sqlx::query(
            r#"
            INSERT INTO ubo_links (verification_id, ubo_user_id, ubo_verification_id)
            VALUES ($1, $2, $3)
            RETURNING id, verification_id, ubo_user_id, ubo_verification_id, created_at
            "#,
        )
        .bind(verification_id)
        .bind(ubo_user_id)
        .bind(ubo_verification_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to store UBO link")?;

        Ok(UboLink {
            id: row.get("id"),
            verification_id: row.get("verification_id"),
            ubo_user_id: row.get("ubo_user_id"),
            ubo_verification_id: row.get("ubo_verification_id"),
            created_at: row.get("created_at"),
        })
    }

    async fn get_ubo_links(&self, verification_id: &str) -> Result<Vec<UboLink>> {
        let rows = sqlx::query(
            r#"
            SELECT id, verification_id, ubo_user_id, ubo_verification_id, created_at
            FROM ubo_links
            WHERE verification_id = $1
            ORDER BY id
            "#,
        )
        .bind(verification_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load UBO links")?;

        Ok(rows
            .into_iter()
            .map(|row| UboLink {
                id: row.get("id"),
                verification_id: row.get("verification_id"),
                ubo_user_id: row.get("ubo_user_id"),
                ubo_verification_id: row.get("ubo_verification_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn create_api_key(
        &self,
        key_value: &str,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKey> {
        let row = sqlx::query(
            r#"
            INSERT INTO api_keys (key_value, name, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, key_value, name, is_active, expires_at, created_at
            "#,
        )
        .bind(key_value)
        .bind(name)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create API key")?;

        Ok(row_to_api_key(&row))
    }

    async fn get_api_key(&self, key_value: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query(
            "SELECT id, key_value, name, is_active, expires_at, created_at FROM api_keys WHERE key_value = $1",
        )
        .bind(key_value)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load API key")?;

        Ok(row.as_ref().map(row_to_api_key))
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>> {
        let rows = sqlx::query(
            "SELECT id, key_value, name, is_active, expires_at, created_at FROM api_keys ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list API keys")?;

        Ok(rows.iter().map(row_to_api_key).collect())
    }

    async fn deactivate_api_key(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE api_keys SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to deactivate API key")?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, hashed_password, is_active, is_admin, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load user")?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            hashed_password: row.get("hashed_password"),
            is_active: row.get("is_active"),
            is_admin: row.get("is_admin"),
            created_at: row.get("created_at"),
        }))
    }

    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (email, hashed_password, is_admin)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password, is_active, is_admin, created_at
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: row.get("id"),
            email: row.get("email"),
            hashed_password: row.get("hashed_password"),
            is_active: row.get("is_active"),
            is_admin: row.get("is_admin"),
            created_at: row.get("created_at"),
        })
    }
}

fn row_to_api_key(row: &PgRow) -> ApiKey {
    ApiKey {
        id: row.get("id"),
        key_value: row.get("key_value"),
        name: row.get("name"),
        is_active: row.get("is_active"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}
