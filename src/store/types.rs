//! Persistent state types
//!
//! One `Verification` owns its `VerificationInput` and agent-result rows;
//! business verifications weakly reference their UBO children through
//! `UboLink`. Rows are keyed by surrogate ids so append order is the id
//! order within a verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle states of a verification, monotone through
/// `queued -> processing -> (completed | failed)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown verification status: {}", s)),
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final decision attached to a completed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationOutcome {
    Passed,
    Failed,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for VerificationOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown verification outcome: {}", s)),
        }
    }
}

/// Which state machine a verification runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationKind {
    Individual,
    Business,
}

/// A top-level verification record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub verification_id: String,
    pub user_id: Option<String>,
    pub business_id: Option<String>,
    pub status: VerificationStatus,
    pub result: Option<VerificationOutcome>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Verification {
    pub fn kind(&self) -> VerificationKind {
        if self.business_id.is_some() {
            VerificationKind::Business
        } else {
            VerificationKind::Individual
        }
    }
}

/// An input payload persisted during the acquisition phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationInput {
    pub id: i64,
    pub verification_id: String,
    pub data_type: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// Result status of a single agent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Error,
    Warning,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            _ => Err(format!("unknown agent status: {}", s)),
        }
    }
}

/// Status of one named check inside an agent result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    Warning,
    NotApplicable,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Warning => "warning",
            Self::NotApplicable => "not_applicable",
            Self::Error => "error",
        }
    }

    /// Map a provider-reported status string onto the check vocabulary
    pub fn from_provider(s: &str) -> Self {
        match s {
            "passed" | "success" => Self::Passed,
            "failed" => Self::Failed,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::NotApplicable,
        }
    }
}

/// A named pass/fail/warning/na/error datum with human-readable details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Check {
    pub fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            details: details.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// The tagged record every agent produces
///
/// `extras` carries agent-specific fields: the compilation agents put
/// `verification_result`, `reasoning`, `risk_factors`, and `confidence`
/// there; acquisition puts the acquired payload map there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent_type: String,
    pub status: AgentStatus,
    pub details: String,
    pub checks: Vec<Check>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extras: serde_json::Map<String, Value>,
}

impl AgentReport {
    pub fn success(agent_type: impl Into<String>, details: impl Into<String>, checks: Vec<Check>) -> Self {
        Self {
            agent_type: agent_type.into(),
            status: AgentStatus::Success,
            details: details.into(),
            checks,
            extras: serde_json::Map::new(),
        }
    }

    pub fn error(agent_type: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            status: AgentStatus::Error,
            details: details.into(),
            checks: Vec::new(),
            extras: serde_json::Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(Value::as_str)
    }
}

/// A persisted agent result row; `id` order is append order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResultRow {
    pub id: i64,
    pub verification_id: String,
    pub report: AgentReport,
    pub created_at: DateTime<Utc>,
}

/// Link from a parent business verification to one UBO child verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UboLink {
    pub id: i64,
    pub verification_id: String,
    pub ubo_user_id: String,
    pub ubo_verification_id: String,
    pub created_at: DateTime<Utc>,
}

/// Filters for the listing queries, paginated by `created_at desc`
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<VerificationStatus>,
    pub skip: i64,
    pub limit: i64,
}

/// An API key row gating inbound submissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub key_value: String,
    pub name: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A user row backing bearer-token issuance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
