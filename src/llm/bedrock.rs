//! Amazon Bedrock inference client
//!
//! Speaks the Anthropic messages body format for both text and vision
//! invocations. Credentials and region come from the standard AWS
//! environment (`AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use base64::Engine;
use serde_json::{json, Value};
use tracing::error;

use super::Llm;

/// Bedrock runtime client wrapper
#[derive(Clone)]
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
}

impl BedrockClient {
    /// Build a client from the ambient AWS configuration
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_bedrockruntime::Client::new(&config),
        }
    }

    pub fn new(client: aws_sdk_bedrockruntime::Client) -> Self {
        Self { client }
    }

    async fn invoke_body(&self, model_id: &str, body: Value) -> Result<String> {
        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(serde_json::to_vec(&body)?))
            .send()
            .await
            .map_err(|e| {
                error!("Bedrock invocation failed: {}", e);
                anyhow!("Bedrock invocation failed: {}", e)
            })?;

        let payload: Value = serde_json::from_slice(&response.body.into_inner())
            .context("Bedrock returned a non-JSON body")?;

        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Bedrock response carried no text content"))
    }
}

#[async_trait]
impl Llm for BedrockClient {
    async fn invoke(
        &self,
        prompt: &str,
        model_id: &str,
        max_tokens: u32,
        temperature: f32,
        top_p: f32,
    ) -> Result<String> {
        let body = json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": max_tokens,
            "temperature": temperature,
            "top_p": top_p,
            "messages": [{"role": "user", "content": prompt}],
        });
        self.invoke_body(model_id, body).await
    }

    async fn invoke_vision(
        &self,
        image_png: &[u8],
        prompt: &str,
        model_id: &str,
    ) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_png);
        let body = json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": 4096,
            "temperature": 0.1,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/png",
                            "data": encoded,
                        }
                    },
                    {"type": "text", "text": prompt}
                ]
            }],
        });
        self.invoke_body(model_id, body).await
    }
}
