//! Sanctions-search client
//!
//! Implements [`SanctionsProvider`] over the internal OFAC search service.
//! The analysis step is a pure function so it can run over persisted search
//! snapshots in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::info;

use super::{SanctionsProvider, SanctionsQuery};

/// OFAC search client
#[derive(Clone)]
pub struct OfacClient {
    base_url: String,
    http: Client,
}

impl OfacClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build sanctions HTTP client")?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }
}

#[async_trait]
impl SanctionsProvider for OfacClient {
    async fn search_entity(&self, query: &SanctionsQuery) -> Result<Value> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        for (key, value) in [
            ("name", query.name.as_str()),
            ("address", query.address.as_str()),
            ("city", query.city.as_str()),
            ("state", query.state.as_str()),
            ("zip", query.zip.as_str()),
            ("country", query.country.as_str()),
        ] {
            if !value.is_empty() {
                params.push((key, value));
            }
        }

        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("Sanctions search request failed")?
            .error_for_status()
            .context("Sanctions search returned an error status")?;

        let results: Value = response
            .json()
            .await
            .context("Sanctions search returned a non-JSON body")?;

        info!(
            "Sanctions search for '{}' found {} entities",
            query.name,
            results["entities"].as_array().map(Vec::len).unwrap_or(0)
        );
        Ok(results)
    }

    fn analyze(&self, search_results: &Value) -> Value {
        analyze_search_results(search_results)
    }
}

/// Fold raw search results into match counts, details, sources, and a risk
/// level. An exact name match raises the level to `high`; any match at all
/// is at least `medium`.
pub fn analyze_search_results(search_results: &Value) -> Value {
    let entities = search_results["entities"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let query_info = search_results["query"].clone();
    let queried_name = query_info["name"].as_str().unwrap_or_default().to_lowercase();

    let mut match_details = Vec::new();
    let mut sources = BTreeSet::new();
    let mut exact_match = false;

    for entity in &entities {
        let name = entity["name"].as_str().unwrap_or_default();
        if !queried_name.is_empty() && name.to_lowercase() == queried_name {
            exact_match = true;
        }
        if let Some(source) = entity["source"].as_str() {
            sources.insert(source.to_string());
        }
        match_details.push(json!({
            "name": entity["name"],
            "type": entity["type"],
            "source": entity["source"],
            "source_id": entity["sourceID"],
            "addresses": entity["addresses"].as_array().cloned().unwrap_or_default(),
            "person_info": entity["person"].clone(),
            "business_info": entity["business"].clone(),
            "organization_info": entity["organization"].clone(),
        }));
    }

    let risk_level = if entities.is_empty() {
        "low"
    } else if exact_match {
        "high"
    } else {
        "medium"
    };

    json!({
        "total_matches": entities.len(),
        "has_matches": !entities.is_empty(),
        "query_info": query_info,
        "match_details": match_details,
        "risk_level": risk_level,
        "sources": sources.into_iter().collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matches_is_low_risk() {
        let analysis = analyze_search_results(&json!({"entities": [], "query": {"name": "John"}}));
        assert_eq!(analysis["risk_level"], "low");
        assert_eq!(analysis["has_matches"], false);
        assert_eq!(analysis["total_matches"], 0);
    }

    #[test]
    fn exact_name_match_is_high_risk() {
        let results = json!({
            "entities": [
                {"name": "John Doe", "type": "person", "source": "SDN", "sourceID": "1"}
            ],
            "query": {"name": "john doe"}
        });
        let analysis = analyze_search_results(&results);
        assert_eq!(analysis["risk_level"], "high");
        assert_eq!(analysis["sources"][0], "SDN");
    }

    #[test]
    fn partial_match_is_medium_risk() {
        let results = json!({
            "entities": [
                {"name": "John Doe Jr", "type": "person", "source": "SDN", "sourceID": "1"}
            ],
            "query": {"name": "john doe"}
        });
        let analysis = analyze_search_results(&results);
        assert_eq!(analysis["risk_level"], "medium");
        assert_eq!(analysis["total_matches"], 1);
    }
}
