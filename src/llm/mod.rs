//! LLM access for agents and the document pipeline
//!
//! All invocations flow through [`LlmPool`], a process-wide counting gate
//! that caps in-flight provider calls. Agents never hold a raw client.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub mod bedrock;

pub use bedrock::BedrockClient;

/// Text + vision inference capability
#[async_trait]
pub trait Llm: Send + Sync {
    /// Generate text for a prompt
    async fn invoke(
        &self,
        prompt: &str,
        model_id: &str,
        max_tokens: u32,
        temperature: f32,
        top_p: f32,
    ) -> Result<String>;

    /// Generate text for a prompt over a single PNG page
    async fn invoke_vision(&self, image_png: &[u8], prompt: &str, model_id: &str)
        -> Result<String>;
}

/// Pull a JSON object out of a model response.
///
/// Tolerates a fenced ```json block or a bare `{…}` span anywhere in the
/// text. Never fails: unparseable output comes back as
/// `{"raw_response": …, "parse_error": …}` so callers can persist it.
pub fn parse_structured_response(text: &str) -> Value {
    if let Some(fenced) = text.split("```json").nth(1) {
        if let Some(body) = fenced.split("```").next() {
            if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
                return value;
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return value;
            }
        }
    }

    json!({
        "raw_response": text,
        "parse_error": "no JSON object found in model response",
    })
}

/// Bounded LLM client pool
///
/// Wraps a shared [`Llm`] behind a semaphore so concurrent agents cannot
/// exceed provider concurrency. Clones share the same permit pool.
#[derive(Clone)]
pub struct LlmPool {
    llm: Arc<dyn Llm>,
    permits: Arc<Semaphore>,
    model_id: String,
}

impl LlmPool {
    pub fn new(llm: Arc<dyn Llm>, max_in_flight: usize, model_id: impl Into<String>) -> Self {
        Self {
            llm,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Generate text for a prompt under the concurrency gate
    pub async fn invoke(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let _permit = self.permits.acquire().await?;
        self.llm
            .invoke(prompt, &self.model_id, max_tokens, temperature, 0.9)
            .await
    }

    /// Run a vision prompt over one PNG page under the concurrency gate
    pub async fn invoke_vision(&self, image_png: &[u8], prompt: &str) -> Result<String> {
        let _permit = self.permits.acquire().await?;
        self.llm
            .invoke_vision(image_png, prompt, &self.model_id)
            .await
    }

    /// Extract structured data from `data` per `instructions`.
    ///
    /// The provider call itself may fail (and that error propagates); a
    /// malformed model response does not; it is returned as the
    /// `raw_response`/`parse_error` payload.
    pub async fn extract_structured(&self, data: &Value, instructions: &str) -> Result<Value> {
        let prompt = format!(
            "You are a data extraction expert. Extract the required information based on the following criteria:\n\n\
             {instructions}\n\n\
             Here is the data to analyze:\n{data:#}\n\n\
             Respond ONLY with a valid JSON object containing the extraction results."
        );
        let response = self.invoke(&prompt, 2048, 0.1).await?;
        Ok(parse_structured_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"verification_result\": \"passed\"}\n```\nDone.";
        let value = parse_structured_response(text);
        assert_eq!(value["verification_result"], "passed");
    }

    #[test]
    fn parses_bare_object_span() {
        let text = "Sure. {\"risk_level\": \"low\", \"summary\": \"ok\"} hope that helps";
        let value = parse_structured_response(text);
        assert_eq!(value["risk_level"], "low");
    }

    #[test]
    fn malformed_output_is_captured_not_raised() {
        let value = parse_structured_response("I cannot answer that.");
        assert_eq!(value["raw_response"], "I cannot answer that.");
        assert!(value["parse_error"].is_string());
    }

    #[test]
    fn prefers_fence_over_surrounding_braces() {
        let text = "{broken ```json\n{\"a\": 1}\n``` trailing}";
        let value = parse_structured_response(text);
        assert_eq!(value["a"], 1);
    }
}
