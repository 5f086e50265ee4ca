//! Persona identity-proofing client
//!
//! Implements [`IdProvider`] over Persona's REST API. The business-info
//! extraction is a pure transform over the inquiry payload's documented
//! field map (`business-*`, `control-person-*`, `ubo-{1..4}-*`) so it can
//! run on persisted inquiry snapshots as well as live responses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{BlobStore, DocumentRef, IdProvider};

const DEFAULT_BASE_URL: &str = "https://api.withpersona.com/api/v1";

/// At most four beneficial owners appear on an inquiry
const MAX_INLINE_UBOS: usize = 4;

/// Persona API client
#[derive(Clone)]
pub struct PersonaClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl PersonaClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build Persona HTTP client")?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Persona request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("Persona returned an error status for {}", url))?;
        response
            .json()
            .await
            .context("Persona returned a non-JSON body")
    }
}

/// Value of a named field in the inquiry's `fields` map
fn field_value(fields: &Value, name: &str) -> Value {
    fields[name]["value"].clone()
}

fn field_str(fields: &Value, name: &str) -> String {
    fields[name]["value"].as_str().unwrap_or_default().to_string()
}

#[async_trait]
impl IdProvider for PersonaClient {
    async fn get_inquiry(&self, inquiry_id: &str) -> Result<Value> {
        let url = format!("{}/inquiries/{}", self.base_url, inquiry_id);
        self.get_json(&url).await
    }

    fn extract_business_info(&self, inquiry: &Value) -> Value {
        let data = &inquiry["data"];
        let attributes = &data["attributes"];
        let fields = &attributes["fields"];

        let industry = field_str(fields, "business-industry");
        let business_info = json!({
            "business_name": field_value(fields, "business-name"),
            "business_tax_id": field_value(fields, "business-tax-identification-number"),
            "business_website": field_value(fields, "business-website"),
            "business_phone": field_value(fields, "business-phone-number"),
            "business_formation_date": field_value(fields, "business-formation-date"),
            "business_description": field_value(fields, "business-description"),
            "entity_type": field_value(fields, "entity-type"),
            "business_industry": field_value(fields, "business-industry"),
            "business_subindustry": field_value(fields, &format!("business-subindustry-{industry}")),
            "registration_number": field_value(fields, "business-registration-number"),
            "address": {
                "street_1": field_value(fields, "business-physical-address-street-1"),
                "street_2": field_value(fields, "business-physical-address-street-2"),
                "city": field_value(fields, "business-physical-address-city"),
                "state": field_value(fields, "business-physical-address-subdivision"),
                "postal_code": field_value(fields, "business-physical-address-postal-code"),
                "country_code": field_value(fields, "business-physical-address-country-code"),
            },
        });

        let control_person = json!({
            "name_first": field_value(fields, "control-person-name-first"),
            "name_last": field_value(fields, "control-person-name-last"),
            "email": field_value(fields, "control-person-email-address"),
            "job_title": field_value(fields, "control-person-job-title"),
            "is_also_owner": field_value(fields, "control-person-is-also-owner"),
            "percentage_ownership": field_value(fields, "control-person-percentage-ownership"),
            "country_code": field_value(fields, "control-person-id-country-code"),
        });

        let mut ubos = Vec::new();
        for i in 1..=MAX_INLINE_UBOS {
            let first = field_str(fields, &format!("ubo-{i}-name-first"));
            if first.is_empty() {
                continue;
            }
            ubos.push(json!({
                "name_first": first,
                "name_last": field_value(fields, &format!("ubo-{i}-name-last")),
                "email": field_value(fields, &format!("ubo-{i}-email-address")),
                "job_title": field_value(fields, &format!("ubo-{i}-job-title")),
                "percentage_ownership": field_value(fields, &format!("ubo-{i}-percentage-ownership")),
                "association": field_value(fields, &format!("ubo-{i}-association")),
                "country_code": field_value(fields, &format!("ubo-{i}-id-country-code")),
            }));
        }

        let included = inquiry["included"].as_array().cloned().unwrap_or_default();

        let verifications: Vec<Value> = included
            .iter()
            .filter(|item| {
                item["type"]
                    .as_str()
                    .map(|t| t.starts_with("verification/"))
                    .unwrap_or(false)
            })
            .map(|item| {
                json!({
                    "type": item["type"],
                    "id": item["id"],
                    "status": item["attributes"]["status"],
                })
            })
            .collect();

        let reports: Vec<Value> = included
            .iter()
            .filter(|item| {
                item["type"]
                    .as_str()
                    .map(|t| t.starts_with("report/"))
                    .unwrap_or(false)
            })
            .map(|item| {
                json!({
                    "type": item["type"],
                    "id": item["id"],
                    "status": item["attributes"]["status"],
                    "has_match": item["attributes"]["has-match"],
                })
            })
            .collect();

        let watchlist_details = included
            .iter()
            .find(|item| item["type"] == "report/watchlist")
            .map(|item| {
                json!({
                    "has_match": item["attributes"]["has-match"].as_bool().unwrap_or(false),
                    "matched_lists": item["attributes"]["matched-lists"].clone(),
                })
            })
            .unwrap_or_else(|| json!({}));

        let classification_details = included
            .iter()
            .find(|item| item["type"] == "report/business-classification")
            .and_then(|item| item["attributes"]["result"].as_object().cloned())
            .map(|result| {
                let result = Value::Object(result);
                let codes = |key: &str| -> Vec<Value> {
                    result[key]
                        .as_array()
                        .map(|codes| codes.iter().map(|c| c["code"].clone()).collect())
                        .unwrap_or_default()
                };
                json!({
                    "naics_codes": codes("naics-information"),
                    "mcc_codes": codes("mcc-information"),
                    "keywords": result["keywords"].clone(),
                    "is_high_risk": result["is-high-risk"].as_bool().unwrap_or(false),
                })
            })
            .unwrap_or_else(|| json!({}));

        json!({
            "inquiry_id": data["id"],
            "status": attributes["status"],
            "created_at": attributes["created-at"],
            "completed_at": attributes["completed-at"],
            "business_info": business_info,
            "control_person": control_person,
            "beneficial_owners": ubos,
            "verifications": verifications,
            "reports": reports,
            "watchlist_details": watchlist_details,
            "classification_details": classification_details,
        })
    }

    async fn get_and_store_documents(
        &self,
        inquiry_id: &str,
        blobs: &dyn BlobStore,
    ) -> Result<Vec<DocumentRef>> {
        let inquiry = self.get_inquiry(inquiry_id).await?;
        let included = inquiry["included"].as_array().cloned().unwrap_or_default();

        let mut documents = Vec::new();
        for item in included {
            let Some(item_type) = item["type"].as_str() else {
                continue;
            };
            if !item_type.contains("document") {
                continue;
            }

            let doc_id = item["id"].as_str().unwrap_or_default().to_string();
            let attributes = &item["attributes"];

            // The files array has priority over files-normalized
            let file_info = attributes["files"]
                .as_array()
                .and_then(|files| files.first())
                .or_else(|| {
                    attributes["files-normalized"]
                        .as_array()
                        .and_then(|files| files.first())
                })
                .cloned();

            let mut document = DocumentRef {
                id: doc_id.clone(),
                name: attributes["kind"]
                    .as_str()
                    .unwrap_or("Unknown Document")
                    .to_string(),
                filename: file_info
                    .as_ref()
                    .and_then(|f| f["filename"].as_str())
                    .map(str::to_string),
                content_type: None,
                blob_key: None,
                blob_url: None,
                checks: attributes["checks"].as_array().cloned().unwrap_or_default(),
                error: None,
            };

            let file_url = file_info
                .as_ref()
                .and_then(|f| f["url"].as_str())
                .map(str::to_string);

            if let Some(url) = file_url {
                let stored = self
                    .download_and_store(&url, &document, inquiry_id, blobs)
                    .await;
                match stored {
                    Ok((blob, content_type)) => {
                        document.blob_key = Some(blob.key);
                        document.blob_url = Some(blob.url);
                        document.content_type = Some(content_type);
                    }
                    Err(e) => {
                        error!("Failed to persist document {}: {}", doc_id, e);
                        document.error = Some(e.to_string());
                    }
                }
            } else {
                warn!("Document {} carries no downloadable file", doc_id);
            }

            documents.push(document);
        }

        info!(
            "Stored {} documents for inquiry {}",
            documents.iter().filter(|d| d.blob_key.is_some()).count(),
            inquiry_id
        );
        Ok(documents)
    }
}

impl PersonaClient {
    async fn download_and_store(
        &self,
        url: &str,
        document: &DocumentRef,
        inquiry_id: &str,
        blobs: &dyn BlobStore,
    ) -> Result<(super::StoredBlob, String)> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Document download failed")?
            .error_for_status()
            .context("Document download returned an error status")?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await.context("Document body read failed")?;

        let file_name = document
            .filename
            .clone()
            .unwrap_or_else(|| format!("{}_{}", document.id, document.name));

        let mut metadata = HashMap::new();
        metadata.insert("document_id".to_string(), document.id.clone());
        metadata.insert("inquiry_id".to_string(), inquiry_id.to_string());

        let blob = blobs
            .put(bytes.to_vec(), Some(&file_name), &content_type, metadata)
            .await?;
        Ok((blob, content_type))
    }
}

/// Build a minimal inquiry payload for tests and fixtures
pub fn inquiry_fixture(fields: Map<String, Value>, included: Vec<Value>) -> Value {
    json!({
        "data": {
            "id": "inq_fixture",
            "attributes": {
                "status": "completed",
                "fields": fields,
            }
        },
        "included": included,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_field(v: &str) -> Value {
        json!({ "value": v })
    }

    #[test]
    fn extracts_business_fields_and_ubos() {
        let mut fields = Map::new();
        fields.insert("business-name".into(), value_field("Acme Holdings LLC"));
        fields.insert(
            "business-tax-identification-number".into(),
            value_field("12-3456789"),
        );
        fields.insert("entity-type".into(), value_field("LLC"));
        fields.insert("ubo-1-name-first".into(), value_field("Jane"));
        fields.insert("ubo-1-name-last".into(), value_field("Smith"));
        fields.insert("ubo-3-name-first".into(), value_field("Omar"));

        let inquiry = inquiry_fixture(fields, vec![]);
        let client = PersonaClient::new("test-key").unwrap();
        let info = client.extract_business_info(&inquiry);

        assert_eq!(info["business_info"]["business_name"], "Acme Holdings LLC");
        assert_eq!(info["business_info"]["business_tax_id"], "12-3456789");
        let ubos = info["beneficial_owners"].as_array().unwrap();
        assert_eq!(ubos.len(), 2);
        assert_eq!(ubos[0]["name_first"], "Jane");
        assert_eq!(ubos[1]["name_first"], "Omar");
    }

    #[test]
    fn extracts_watchlist_report_details() {
        let included = vec![json!({
            "type": "report/watchlist",
            "id": "rep_1",
            "attributes": {"status": "ready", "has-match": true, "matched-lists": ["sdn"]}
        })];
        let inquiry = inquiry_fixture(Map::new(), included);
        let client = PersonaClient::new("test-key").unwrap();
        let info = client.extract_business_info(&inquiry);

        assert_eq!(info["watchlist_details"]["has_match"], true);
        assert_eq!(info["watchlist_details"]["matched_lists"][0], "sdn");
        assert_eq!(info["reports"][0]["type"], "report/watchlist");
    }
}
