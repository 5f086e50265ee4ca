//! Engine error taxonomy
//!
//! Provider failures are retried locally inside the adapters; everything that
//! escapes an adapter is mapped onto one of these variants at the boundary
//! where it is handled (agent runner, workflow engine, or HTTP façade).

use thiserror::Error;

/// Errors surfaced by the verification engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Network error, 5xx, or rate limit that survived adapter-level retries
    #[error("transient provider failure: {0}")]
    TransientProvider(String),

    /// 404 / empty record from a provider; callers treat this as absent input
    #[error("provider data missing: {0}")]
    ProviderDataMissing(String),

    /// Raised from within an agent; materialized as an error agent result
    #[error("agent failure: {0}")]
    Agent(String),

    /// Acquisition-phase failure; terminates the workflow
    #[error("data acquisition failed: {0}")]
    DataAcquisition(String),

    /// Unhandled failure in engine code outside any agent
    #[error("workflow error: {0}")]
    Workflow(String),

    /// Malformed submission payload (HTTP 422)
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid or expired credential (HTTP 401)
    #[error("authentication error: {0}")]
    Auth(String),

    /// Requested entity does not exist (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("queue error: {0}")]
    Queue(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<redis::RedisError> for EngineError {
    fn from(e: redis::RedisError) -> Self {
        EngineError::Queue(e.to_string())
    }
}
