//! Sift fraud-score client
//!
//! Implements [`FraudProvider`] over Sift's score API. The response is kept
//! as raw JSON; agents read the score, sub-scores, activities, and network
//! sections directly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::FraudProvider;

const DEFAULT_BASE_URL: &str = "https://api.sift.com/v205";

/// Sift API client
#[derive(Clone)]
pub struct SiftClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl SiftClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build Sift HTTP client")?;
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
}

#[async_trait]
impl FraudProvider for SiftClient {
    async fn get_user_score(&self, user_id: &str) -> Result<Value> {
        let url = format!("{}/users/{}/score", self.base_url, user_id);
        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .context("Sift score request failed")?
            .error_for_status()
            .context("Sift returned an error status")?;

        let score: Value = response.json().await.context("Sift returned a non-JSON body")?;
        info!("Fetched fraud score for user {}", user_id);
        Ok(score)
    }
}
