//! Outbound provider capabilities
//!
//! The engine depends only on the traits in this module; the concrete
//! clients (Persona, Sift, OFAC search, registry lookup, the external MySQL
//! record store, S3) live in the submodules. Tests substitute fakes.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub mod external_db;
pub mod ofac;
pub mod persona;
pub mod registry;
pub mod s3;
pub mod sift;

pub use external_db::MysqlRecordStore;
pub use ofac::OfacClient;
pub use persona::PersonaClient;
pub use registry::RegistryClient;
pub use s3::S3BlobStore;
pub use sift::SiftClient;

/// A provider-hosted document fetched from an inquiry and persisted to blob
/// storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    /// Vendor-reported per-document checks, passed through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Blob persisted through a [`BlobStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
}

/// Identity-proofing provider (inquiries, business field extraction,
/// document retrieval)
#[async_trait]
pub trait IdProvider: Send + Sync {
    /// Fetch the full inquiry record
    async fn get_inquiry(&self, inquiry_id: &str) -> Result<Value>;

    /// Pure transform: pull structured business details out of an inquiry
    /// record using the provider's documented field map
    fn extract_business_info(&self, inquiry: &Value) -> Value;

    /// Download every document attached to the inquiry, persist each through
    /// `blobs`, and return the annotated references
    async fn get_and_store_documents(
        &self,
        inquiry_id: &str,
        blobs: &dyn BlobStore,
    ) -> Result<Vec<DocumentRef>>;
}

/// Fraud-scoring provider
#[async_trait]
pub trait FraudProvider: Send + Sync {
    /// Score + sub-scores + activities + network for one user
    async fn get_user_score(&self, user_id: &str) -> Result<Value>;
}

/// Query parameters for a sanctions-list entity search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SanctionsQuery {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

/// Sanctions-search service
#[async_trait]
pub trait SanctionsProvider: Send + Sync {
    /// Search the sanctions lists for an entity
    async fn search_entity(&self, query: &SanctionsQuery) -> Result<Value>;

    /// Pure analysis of raw search results: total matches, risk level
    /// (exact name match => high, any match => medium, else low), match
    /// details, and contributing sources
    fn analyze(&self, search_results: &Value) -> Value;
}

/// Corporate-registry lookup
#[async_trait]
pub trait RegistryProvider: Send + Sync {
    /// Registry record for a business name in a country
    async fn lookup(&self, business_name: &str, country: &str) -> Result<Value>;
}

/// Which inquiry flavour to resolve for a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryKind {
    Kyc,
    Kyb,
}

impl InquiryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kyc => "kyc",
            Self::Kyb => "kyb",
        }
    }
}

/// Read-side adapter over the platform's operational database
///
/// Implementations retry transient failures with exponential backoff and
/// fall back to documented mock records rather than failing the workflow.
#[async_trait]
pub trait ExternalRecordStore: Send + Sync {
    /// Most recent provider inquiry id recorded for a user
    async fn get_inquiry_id(&self, user_id: &str, kind: InquiryKind) -> Result<Option<String>>;

    /// Most recent fraud-score snapshot recorded for a user
    async fn get_fraud_scores(&self, user_id: &str) -> Result<Option<Value>>;

    /// Operational business record (never `None` after fallback kicks in
    /// for transient failures; `None` only for a genuinely unknown id)
    async fn get_business_record(&self, business_id: &str) -> Result<Option<Value>>;

    /// UBO rows recorded for a business
    async fn get_business_owners(&self, business_id: &str) -> Result<Vec<Value>>;
}

/// Object storage for fetched documents
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` and return its key and URL. When `filename` is absent
    /// a fresh UUID key with an extension derived from `content_type` is
    /// generated, so replays re-upload under new keys.
    async fn put(
        &self,
        bytes: Vec<u8>,
        filename: Option<&str>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<StoredBlob>;

    /// Fetch a blob by key
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}
