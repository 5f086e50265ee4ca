//! Document pipeline behavior: rasterization bounds, MIME handling, and
//! parse-failure tolerance

mod helpers;

use helpers::{DocumentFixture, Harness};
use serde_json::json;
use verify_engine::documents::DocumentKind;

#[tokio::test]
async fn only_the_first_three_pdf_pages_are_rasterized() {
    let mut harness = Harness {
        raster_page_count: 50,
        ..Harness::default()
    };
    harness.llm = harness.llm.with_vision_responses(vec![
        format!(
            "```json\n{}\n```",
            json!({ "document_type": "bank_statement", "confidence": "high" })
        ),
        format!("```json\n{}\n```", json!({ "account_number": "1234" })),
    ]);
    let (deps, _) = harness.build();

    let processed = deps
        .documents
        .process_bytes(b"%PDF-1.7 fifty pages")
        .await
        .unwrap();
    assert_eq!(processed.page_count, 3);
    assert!(processed.is_multipage);
}

#[tokio::test]
async fn images_pass_through_without_rasterization() {
    let mut harness = Harness::default();
    harness.llm = harness.llm.with_vision_responses(vec![
        format!(
            "```json\n{}\n```",
            json!({ "document_type": "government_id", "confidence": "medium" })
        ),
        format!("```json\n{}\n```", json!({ "full_name": "Jane Doe" })),
    ]);
    let (deps, _) = harness.build();

    let png_bytes = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let processed = deps.documents.process_bytes(&png_bytes).await.unwrap();
    assert_eq!(processed.page_count, 1);
    assert!(!processed.is_multipage);
    assert_eq!(processed.kind(), DocumentKind::GovernmentId);
}

#[tokio::test]
async fn unparseable_extraction_falls_back_to_full_text() {
    let mut harness = Harness::default();
    harness.llm = harness.llm.with_vision_responses(vec![
        "not json at all".to_string(),
        "free-form narrative about the document".to_string(),
    ]);
    let (deps, _) = harness.build();

    let processed = deps
        .documents
        .process_bytes(&[0xFF, 0xD8, 0xFF, 0xE0])
        .await
        .unwrap();

    // Classification failure is captured, not raised
    assert!(processed.classification["parse_error"].is_string());
    assert_eq!(processed.kind(), DocumentKind::Other);

    // Extraction failure carries the raw text under full_text
    assert_eq!(
        processed.extracted_data["full_text"],
        "free-form narrative about the document"
    );
}

#[tokio::test]
async fn process_inquiry_persists_and_annotates_each_document() {
    let mut harness = Harness::default();
    harness.id_provider.documents.insert(
        "inq-1".to_string(),
        vec![
            DocumentFixture {
                name: "license.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
                checks: vec![],
            },
            DocumentFixture {
                name: "statement.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF-1.4 statement".to_vec(),
                checks: vec![],
            },
        ],
    );
    harness.llm = harness.llm.with_vision_responses(vec![
        format!("```json\n{}\n```", json!({ "document_type": "business_license" })),
        format!("```json\n{}\n```", json!({ "license_number": "L-1" })),
        format!("```json\n{}\n```", json!({ "document_type": "bank_statement" })),
        format!("```json\n{}\n```", json!({ "account_number": "42" })),
    ]);
    let (deps, _) = harness.build();

    let documents = deps.documents.process_inquiry("inq-1").await.unwrap();
    assert_eq!(documents.len(), 2);
    for document in &documents {
        assert!(document.reference.blob_key.is_some());
        assert!(document.ocr.is_some());
        assert!(document.reference.error.is_none());
    }
}
