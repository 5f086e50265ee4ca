//! S3-backed blob storage
//!
//! Documents live under `documents/` in the configured bucket. Keys are
//! generated per upload, so replaying a pipeline re-uploads under fresh
//! keys rather than overwriting.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::{BlobStore, StoredBlob};

/// S3 blob store
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
}

impl S3BlobStore {
    /// Build a store from the ambient AWS configuration
    pub async fn from_env(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

/// File extension (with leading dot) for a MIME type
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "application/pdf" => ".pdf",
        "text/plain" => ".txt",
        "text/csv" => ".csv",
        "application/json" => ".json",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        _ => "",
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        bytes: Vec<u8>,
        filename: Option<&str>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<StoredBlob> {
        let file_name = match filename {
            Some(name) => name.to_string(),
            None => format!("{}{}", Uuid::new_v4(), extension_for_content_type(content_type)),
        };
        let key = format!("documents/{}", file_name);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type);
        for (meta_key, meta_value) in metadata {
            request = request.metadata(meta_key, meta_value);
        }

        request
            .send()
            .await
            .with_context(|| format!("Failed to upload blob {}", key))?;

        info!("Stored blob {}", key);
        Ok(StoredBlob {
            url: self.object_url(&key),
            key,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch blob {}", key))?;

        let bytes = response
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read blob body for {}", key))?;
        Ok(bytes.into_bytes().to_vec())
    }
}
