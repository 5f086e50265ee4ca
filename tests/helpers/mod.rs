//! Shared test doubles: in-memory providers, a canned LLM, and harness
//! wiring for driving workflows without any external service.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use verify_engine::agents::EngineDeps;
use verify_engine::documents::{DocumentPipeline, PageRasterizer, RasterPool};
use verify_engine::integrations::ofac::analyze_search_results;
use verify_engine::integrations::{
    BlobStore, DocumentRef, ExternalRecordStore, FraudProvider, IdProvider, InquiryKind,
    PersonaClient, RegistryProvider, SanctionsProvider, SanctionsQuery, StoredBlob,
};
use verify_engine::llm::{Llm, LlmPool};
use verify_engine::queue::{JobDispatcher, JobFunction};
use verify_engine::store::memory::MemoryStore;

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// Canned LLM: one fixed text response for analysis/compilation calls plus
/// an ordered queue of vision responses for the document pipeline
pub struct FakeLlm {
    text_response: String,
    vision_responses: Mutex<VecDeque<String>>,
}

impl FakeLlm {
    /// An LLM whose compilation output decides `result` and whose analysis
    /// output carries a summary
    pub fn deciding(result: &str) -> Self {
        let body = json!({
            "verification_result": result,
            "reasoning": format!("All signals considered; overall {}", result),
            "risk_factors": [],
            "confidence": "high",
            "summary": "Automated assessment complete",
        });
        Self {
            text_response: format!("```json\n{}\n```", body),
            vision_responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_vision_responses(self, responses: Vec<String>) -> Self {
        *self.vision_responses.lock().unwrap() = responses.into();
        self
    }
}

#[async_trait]
impl Llm for FakeLlm {
    async fn invoke(
        &self,
        _prompt: &str,
        _model_id: &str,
        _max_tokens: u32,
        _temperature: f32,
        _top_p: f32,
    ) -> Result<String> {
        Ok(self.text_response.clone())
    }

    async fn invoke_vision(
        &self,
        _image_png: &[u8],
        _prompt: &str,
        _model_id: &str,
    ) -> Result<String> {
        Ok(self
            .vision_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "{}".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Blob storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        bytes: Vec<u8>,
        filename: Option<&str>,
        _content_type: &str,
        _metadata: HashMap<String, String>,
    ) -> Result<StoredBlob> {
        let name = filename
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let key = format!("documents/{}", name);
        self.blobs.lock().unwrap().insert(key.clone(), bytes);
        Ok(StoredBlob {
            url: format!("memory://{}", key),
            key,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("blob {} not found", key))
    }
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

/// One provider-hosted document fixture
pub struct DocumentFixture {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub checks: Vec<Value>,
}

/// Identity provider fake: inquiry payloads by id plus document fixtures
/// by inquiry id. Field extraction delegates to the production transform.
#[derive(Default)]
pub struct FakeIdProvider {
    pub inquiries: HashMap<String, Value>,
    pub documents: HashMap<String, Vec<DocumentFixture>>,
}

#[async_trait]
impl IdProvider for FakeIdProvider {
    async fn get_inquiry(&self, inquiry_id: &str) -> Result<Value> {
        self.inquiries
            .get(inquiry_id)
            .cloned()
            .ok_or_else(|| anyhow!("inquiry {} not found", inquiry_id))
    }

    fn extract_business_info(&self, inquiry: &Value) -> Value {
        // The transform is pure; reuse the production field map
        PersonaClient::new("test-key")
            .map(|client| client.extract_business_info(inquiry))
            .unwrap_or_else(|_| json!({}))
    }

    async fn get_and_store_documents(
        &self,
        inquiry_id: &str,
        blobs: &dyn BlobStore,
    ) -> Result<Vec<DocumentRef>> {
        let fixtures = self.documents.get(inquiry_id).map(Vec::as_slice).unwrap_or(&[]);
        let mut references = Vec::new();
        for (index, fixture) in fixtures.iter().enumerate() {
            let blob = blobs
                .put(
                    fixture.bytes.clone(),
                    Some(&format!("{}-{}", inquiry_id, fixture.name)),
                    &fixture.content_type,
                    HashMap::new(),
                )
                .await?;
            references.push(DocumentRef {
                id: format!("doc-{}", index),
                name: fixture.name.clone(),
                filename: Some(fixture.name.clone()),
                content_type: Some(fixture.content_type.clone()),
                blob_key: Some(blob.key),
                blob_url: Some(blob.url),
                checks: fixture.checks.clone(),
                error: None,
            });
        }
        Ok(references)
    }
}

// ---------------------------------------------------------------------------
// External record store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRecordStore {
    pub inquiry_ids: HashMap<String, String>,
    pub fraud_scores: HashMap<String, Value>,
    pub business_records: HashMap<String, Value>,
    pub business_owners: HashMap<String, Vec<Value>>,
    /// Simulate the identifier store being down past all retries
    pub fail_inquiry_lookup: bool,
}

#[async_trait]
impl ExternalRecordStore for FakeRecordStore {
    async fn get_inquiry_id(&self, user_id: &str, _kind: InquiryKind) -> Result<Option<String>> {
        if self.fail_inquiry_lookup {
            return Err(anyhow!("external database unreachable after retries"));
        }
        Ok(self.inquiry_ids.get(user_id).cloned())
    }

    async fn get_fraud_scores(&self, user_id: &str) -> Result<Option<Value>> {
        Ok(self.fraud_scores.get(user_id).cloned())
    }

    async fn get_business_record(&self, business_id: &str) -> Result<Option<Value>> {
        Ok(self.business_records.get(business_id).cloned())
    }

    async fn get_business_owners(&self, business_id: &str) -> Result<Vec<Value>> {
        Ok(self
            .business_owners
            .get(business_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Fraud, sanctions, registry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeFraud {
    pub scores: HashMap<String, Value>,
}

#[async_trait]
impl FraudProvider for FakeFraud {
    async fn get_user_score(&self, user_id: &str) -> Result<Value> {
        Ok(self.scores.get(user_id).cloned().unwrap_or_else(|| json!({})))
    }
}

/// Sanctions fake keyed by lowercased entity name; analysis reuses the
/// production fold
#[derive(Default)]
pub struct FakeSanctions {
    pub entities: HashMap<String, Vec<Value>>,
}

#[async_trait]
impl SanctionsProvider for FakeSanctions {
    async fn search_entity(&self, query: &SanctionsQuery) -> Result<Value> {
        let entities = self
            .entities
            .get(&query.name.to_lowercase())
            .cloned()
            .unwrap_or_default();
        Ok(json!({
            "entities": entities,
            "query": serde_json::to_value(query)?,
        }))
    }

    fn analyze(&self, search_results: &Value) -> Value {
        analyze_search_results(search_results)
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub records: HashMap<String, Value>,
}

#[async_trait]
impl RegistryProvider for FakeRegistry {
    async fn lookup(&self, business_name: &str, _country: &str) -> Result<Value> {
        Ok(self
            .records
            .get(business_name)
            .cloned()
            .unwrap_or_else(|| json!({})))
    }
}

// ---------------------------------------------------------------------------
// Rasterizer and dispatcher
// ---------------------------------------------------------------------------

/// Pretends every PDF has `page_count` pages; returns stub PNG bytes and
/// honors the pipeline's page cap
pub struct StubRasterizer {
    pub page_count: usize,
}

impl PageRasterizer for StubRasterizer {
    fn rasterize(&self, _pdf_bytes: &[u8], max_pages: usize, _scale: f32) -> Result<Vec<Vec<u8>>> {
        Ok((0..self.page_count.min(max_pages))
            .map(|i| format!("stub-page-{}", i).into_bytes())
            .collect())
    }
}

/// Records dispatched jobs instead of touching Redis
#[derive(Default)]
pub struct RecordingDispatcher {
    pub jobs: Mutex<Vec<(JobFunction, Value)>>,
}

impl RecordingDispatcher {
    pub fn dispatched(&self) -> Vec<(JobFunction, Value)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn dispatch(&self, function: JobFunction, args: &Value) -> Result<String> {
        self.jobs.lock().unwrap().push((function, args.clone()));
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Everything configurable about a test engine, with passing defaults
pub struct Harness {
    pub llm: FakeLlm,
    pub id_provider: FakeIdProvider,
    pub records: FakeRecordStore,
    pub fraud: FakeFraud,
    pub sanctions: FakeSanctions,
    pub registry: FakeRegistry,
    pub raster_page_count: usize,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            llm: FakeLlm::deciding("passed"),
            id_provider: FakeIdProvider::default(),
            records: FakeRecordStore::default(),
            fraud: FakeFraud::default(),
            sanctions: FakeSanctions::default(),
            registry: FakeRegistry::default(),
            raster_page_count: 1,
        }
    }
}

impl Harness {
    /// Wire the fakes into an engine dependency graph backed by the
    /// in-memory store. Returns the deps and the store handle for
    /// assertions.
    pub fn build(self) -> (Arc<EngineDeps>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::default());
        let id_provider = Arc::new(self.id_provider);
        let llm = LlmPool::new(Arc::new(self.llm), 4, "test-model");
        let raster = RasterPool::new(
            Arc::new(StubRasterizer {
                page_count: self.raster_page_count,
            }),
            2,
        );
        let documents =
            DocumentPipeline::new(id_provider.clone(), blobs.clone(), llm.clone(), raster);

        let deps = Arc::new(EngineDeps {
            store: store.clone(),
            records: Arc::new(self.records),
            id_provider,
            fraud: Arc::new(self.fraud),
            sanctions: Arc::new(self.sanctions),
            registry: Arc::new(self.registry),
            blobs,
            llm,
            documents,
        });
        (deps, store)
    }
}

// ---------------------------------------------------------------------------
// Provider payload fixtures
// ---------------------------------------------------------------------------

/// A provider inquiry whose watchlist, geolocation, and government-id
/// verifications all pass
pub fn passing_inquiry() -> Value {
    let id_checks: Vec<Value> = [
        "id_barcode_detection",
        "id_barcode_inconsistency_detection",
        "id_compromised_detection",
        "id_disallowed_country_detection",
        "id_disallowed_type_detection",
        "id_electronic_replica_detection",
        "id_expired_detection",
        "id_fabrication_detection",
        "id_inconsistent_repeat_detection",
        "id_po_box_detection",
        "id_portrait_clarity_detection",
        "id_portrait_detection",
        "id_tamper_detection",
    ]
    .iter()
    .map(|name| json!({ "name": name, "status": "passed", "metadata": {} }))
    .chain(std::iter::once(json!({
        "name": "id_selfie_comparison",
        "status": "passed",
        "metadata": { "confidence-score": 0.95 },
    })))
    .collect();

    json!({
        "data": {
            "id": "inq-1",
            "attributes": {
                "status": "completed",
                "fields": {
                    "name-first": { "value": "Jane" },
                    "name-last": { "value": "Doe" },
                    "address-country-code": { "value": "US" },
                },
            },
        },
        "included": [
            {
                "type": "verification/watchlist",
                "checks": [
                    { "name": "watchlist_pep_detection", "status": "passed" },
                    { "name": "watchlist_ofac_detection", "status": "passed" },
                ],
            },
            { "type": "verification/geolocation", "status": "passed" },
            { "type": "verification/government-id", "checks": id_checks },
        ],
    })
}

/// Business-inquiry fields for a US LLC with one named beneficial owner
pub fn business_inquiry(name: &str, tax_id: &str) -> Value {
    let mut fields = Map::new();
    fields.insert("business-name".into(), json!({ "value": name }));
    fields.insert(
        "business-tax-identification-number".into(),
        json!({ "value": tax_id }),
    );
    fields.insert("entity-type".into(), json!({ "value": "LLC" }));
    fields.insert("business-industry".into(), json!({ "value": "software" }));
    fields.insert(
        "business-physical-address-subdivision".into(),
        json!({ "value": "CA" }),
    );
    fields.insert(
        "business-physical-address-country-code".into(),
        json!({ "value": "US" }),
    );
    fields.insert("ubo-1-name-first".into(), json!({ "value": "Jane" }));
    fields.insert("ubo-1-name-last".into(), json!({ "value": "Smith" }));

    json!({
        "data": {
            "id": "inq-biz",
            "attributes": { "status": "completed", "fields": fields },
        },
        "included": [],
    })
}
