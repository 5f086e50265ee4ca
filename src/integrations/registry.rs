//! Corporate-registry lookup client
//!
//! Implements [`RegistryProvider`] over an OpenCorporates-style company
//! search API. Agents cross-validate submitted business type, industry, and
//! filing recency against the returned record.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use super::RegistryProvider;

/// Registry lookup client
#[derive(Clone)]
pub struct RegistryClient {
    base_url: String,
    http: Client,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build registry HTTP client")?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }
}

#[async_trait]
impl RegistryProvider for RegistryClient {
    async fn lookup(&self, business_name: &str, country: &str) -> Result<Value> {
        let url = format!("{}/companies/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", business_name), ("jurisdiction", country)])
            .send()
            .await
            .context("Registry lookup request failed")?
            .error_for_status()
            .context("Registry lookup returned an error status")?;

        let body: Value = response
            .json()
            .await
            .context("Registry lookup returned a non-JSON body")?;

        // First hit wins; absent results come back as an empty record so
        // agents treat the fields as missing inputs
        let record = body["results"]
            .as_array()
            .and_then(|results| results.first())
            .cloned()
            .unwrap_or_else(|| json!({}));

        info!(
            "Registry lookup for '{}' in {} {}",
            business_name,
            country,
            if record.as_object().map(|o| o.is_empty()).unwrap_or(true) {
                "found nothing"
            } else {
                "matched"
            }
        );

        Ok(json!({
            "business_name": record["name"].clone(),
            "business_type": record["company_type"].clone(),
            "industry": record["industry"].clone(),
            "registration_number": record["company_number"].clone(),
            "country": country,
            "status": record["current_status"].clone(),
            "incorporation_date": record["incorporation_date"].clone(),
            "last_filing_date": record["latest_filing_date"].clone(),
        }))
    }
}
