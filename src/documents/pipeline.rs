//! Document pipeline
//!
//! Per inquiry: list documents, persist them to blob storage, rasterize
//! PDFs on the CPU pool, classify the first page, then extract structured
//! fields with the kind-specific prompt. Each document is independent; a
//! failure on one document is recorded on that document and does not stop
//! the rest.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::integrations::{BlobStore, DocumentRef, IdProvider};
use crate::llm::{parse_structured_response, LlmPool};

use super::prompts::{classification_prompt, extraction_prompt};
use super::raster::RasterPool;
use super::{sniff_mime, ProcessedDocument, MAX_RASTER_PAGES, RASTER_SCALE};

/// One inquiry document after the full pipeline pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub reference: DocumentRef,
    /// Absent when the document could not be fetched or processed; the
    /// failure is recorded on `reference.error`
    pub ocr: Option<ProcessedDocument>,
}

/// Shared document pipeline
#[derive(Clone)]
pub struct DocumentPipeline {
    id_provider: Arc<dyn IdProvider>,
    blobs: Arc<dyn BlobStore>,
    llm: LlmPool,
    raster: RasterPool,
}

impl DocumentPipeline {
    pub fn new(
        id_provider: Arc<dyn IdProvider>,
        blobs: Arc<dyn BlobStore>,
        llm: LlmPool,
        raster: RasterPool,
    ) -> Self {
        Self {
            id_provider,
            blobs,
            llm,
            raster,
        }
    }

    /// Fetch, persist, classify, and extract every document on an inquiry
    pub async fn process_inquiry(&self, inquiry_id: &str) -> Result<Vec<PipelineDocument>> {
        let references = self
            .id_provider
            .get_and_store_documents(inquiry_id, self.blobs.as_ref())
            .await
            .context("Failed to fetch inquiry documents")?;

        let mut documents = Vec::with_capacity(references.len());
        for mut reference in references {
            let Some(blob_key) = reference.blob_key.clone() else {
                documents.push(PipelineDocument {
                    reference,
                    ocr: None,
                });
                continue;
            };

            let ocr = match self.blobs.get(&blob_key).await {
                Ok(bytes) => match self.process_bytes(&bytes).await {
                    Ok(processed) => Some(processed),
                    Err(e) => {
                        error!("Failed to process document {}: {}", reference.id, e);
                        reference.error = Some(e.to_string());
                        None
                    }
                },
                Err(e) => {
                    error!("Failed to re-read blob {}: {}", blob_key, e);
                    reference.error = Some(e.to_string());
                    None
                }
            };

            documents.push(PipelineDocument { reference, ocr });
        }

        info!(
            "Processed {}/{} documents for inquiry {}",
            documents.iter().filter(|d| d.ocr.is_some()).count(),
            documents.len(),
            inquiry_id
        );
        Ok(documents)
    }

    /// Classify and extract a single stored document
    pub async fn process_bytes(&self, bytes: &[u8]) -> Result<ProcessedDocument> {
        let mime = sniff_mime(bytes);

        let pages: Vec<Vec<u8>> = if mime == "application/pdf" {
            self.raster
                .rasterize(bytes.to_vec(), MAX_RASTER_PAGES, RASTER_SCALE)
                .await
                .context("PDF rasterization failed")?
        } else {
            vec![bytes.to_vec()]
        };

        let first_page = pages.first().context("Document produced no pages")?;

        let classification_text = self
            .llm
            .invoke_vision(first_page, classification_prompt())
            .await
            .context("Document classification failed")?;
        let classification = parse_structured_response(&classification_text);
        if classification.get("parse_error").is_some() {
            warn!("Classifier output was not valid JSON; keeping raw response");
        }

        let kind = classification["document_type"]
            .as_str()
            .map(super::DocumentKind::parse)
            .unwrap_or(super::DocumentKind::Other);

        let extraction_text = self
            .llm
            .invoke_vision(first_page, extraction_prompt(kind))
            .await
            .context("Document field extraction failed")?;
        let extracted_data = match parse_structured_response(&extraction_text) {
            value if value.get("parse_error").is_some() => {
                // Carry the raw text so downstream checks still see content
                serde_json::json!({ "full_text": &extraction_text })
            }
            value => value,
        };

        Ok(ProcessedDocument {
            classification,
            extracted_data,
            raw_text: extraction_text,
            page_count: pages.len(),
            is_multipage: pages.len() > 1,
        })
    }
}

/// Count the non-empty extracted fields of a processed document; used to
/// pick the best candidate when several documents classify the same way
pub fn non_empty_field_count(extracted: &Value) -> usize {
    match extracted {
        Value::Object(map) => map
            .values()
            .filter(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                _ => true,
            })
            .count(),
        _ => 0,
    }
}
