//! Business-agent check semantics, including the document pipeline path

mod helpers;

use std::sync::Arc;

use helpers::{DocumentFixture, Harness};
use serde_json::{json, Value};
use verify_engine::agents::kyb::{
    ArticlesIncorporationAgent, EinLetterAgent, IrsMatchAgent, NormalDiligenceAgent,
    SosFilingsAgent,
};
use verify_engine::agents::{run_agent, Agent, AgentContext};
use verify_engine::store::memory::MemoryStore;
use verify_engine::store::{
    AgentReport, AgentStatus, Check, CheckStatus, VerificationStatus, VerificationStore,
};

fn acme_business_data() -> Value {
    json!({
        "id": "b1",
        "business_name": "Acme Holdings LLC",
        "business_type": "llc",
        "tax_id": "12-3456789",
        "ein_owner_name": "Acme Holdings LLC",
        "legal_structure": "LLC",
        "good_standing": true,
        "tax_id_verified": true,
        "sos_filing_status": "active",
        "incorporation_date": "2019-06-01",
        "last_filing_date": "2025-06-15",
        "persona_inquiry_id": "inq-biz",
        "address": { "state": "CA", "country": "US" }
    })
}

async fn context_with_business_input(
    harness: Harness,
    business_input: Value,
) -> (AgentContext, Arc<MemoryStore>) {
    let (deps, store) = harness.build();
    store
        .create_verification("vb1", None, Some("b1"), VerificationStatus::Queued)
        .await
        .unwrap();
    store
        .store_input("vb1", "business", business_input)
        .await
        .unwrap();
    let ctx = AgentContext::new("vb1", deps).with_business("b1");
    (ctx, store)
}

fn check<'a>(report: &'a AgentReport, name: &str) -> &'a Check {
    report
        .checks
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("check '{}' missing from {}", name, report.agent_type))
}

async fn run(agent: &dyn Agent, ctx: &AgentContext) -> AgentReport {
    let report = run_agent(agent, ctx).await;
    assert_eq!(report.status, AgentStatus::Success, "{:?}", report.details);
    report
}

fn classification_response(kind: &str) -> String {
    format!(
        "```json\n{}\n```",
        json!({
            "document_type": kind,
            "document_subtype": "",
            "issuing_authority": "IRS",
            "confidence": "high"
        })
    )
}

#[tokio::test]
async fn ein_letter_match_passes_presence_and_number_checks() {
    let mut harness = Harness::default();
    harness.id_provider.documents.insert(
        "inq-biz".to_string(),
        vec![DocumentFixture {
            name: "ein-letter.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4 ein letter".to_vec(),
            checks: vec![json!({ "name": "document_integrity", "status": "success" })],
        }],
    );
    harness.llm = harness.llm.with_vision_responses(vec![
        classification_response("ein_letter"),
        format!(
            "```json\n{}\n```",
            json!({
                "company_name": "Acme Holdings LLC",
                "ein": "12-3456789",
                "is_official_irs_letter": true,
                "letter_type": "CP-575"
            })
        ),
    ]);

    let business_input = json!({ "business_data": acme_business_data() });
    let (ctx, _) = context_with_business_input(harness, business_input).await;

    let report = run(&EinLetterAgent, &ctx).await;
    assert_eq!(check(&report, "EIN Letter Present").status, CheckStatus::Passed);
    assert_eq!(
        check(&report, "EIN Number Verification").status,
        CheckStatus::Passed
    );
    assert_eq!(check(&report, "EIN Format Check").status, CheckStatus::Passed);
    assert_eq!(
        check(&report, "Business Name Match").status,
        CheckStatus::Passed
    );
    assert_eq!(
        check(&report, "Letter Authenticity").status,
        CheckStatus::Passed
    );
    // Vendor document checks pass through under the prefixed name
    assert_eq!(
        check(&report, "Persona: ein-letter.pdf - document_integrity").status,
        CheckStatus::Passed
    );
}

#[tokio::test]
async fn mismatched_ein_fails_number_verification() {
    let mut harness = Harness::default();
    harness.id_provider.documents.insert(
        "inq-biz".to_string(),
        vec![DocumentFixture {
            name: "ein-letter.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4 ein letter".to_vec(),
            checks: vec![],
        }],
    );
    harness.llm = harness.llm.with_vision_responses(vec![
        classification_response("ein_letter"),
        format!(
            "```json\n{}\n```",
            json!({ "company_name": "Acme Holdings LLC", "ein": "98-7654321" })
        ),
    ]);

    let business_input = json!({ "business_data": acme_business_data() });
    let (ctx, _) = context_with_business_input(harness, business_input).await;

    let report = run(&EinLetterAgent, &ctx).await;
    assert_eq!(
        check(&report, "EIN Number Verification").status,
        CheckStatus::Failed
    );
}

#[tokio::test]
async fn missing_documents_fail_letter_presence() {
    let business_input = json!({ "business_data": acme_business_data() });
    let (ctx, _) = context_with_business_input(Harness::default(), business_input).await;

    let report = run(&EinLetterAgent, &ctx).await;
    assert_eq!(check(&report, "EIN Letter Present").status, CheckStatus::Failed);
}

#[tokio::test]
async fn articles_document_verifies_name_type_date_and_jurisdiction() {
    let mut harness = Harness::default();
    harness.id_provider.documents.insert(
        "inq-biz".to_string(),
        vec![DocumentFixture {
            name: "articles.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4 articles".to_vec(),
            checks: vec![],
        }],
    );
    harness.llm = harness.llm.with_vision_responses(vec![
        classification_response("articles_of_incorporation"),
        format!(
            "```json\n{}\n```",
            json!({
                "company_name": "Acme Holdings LLC",
                "type_of_entity": "LLC",
                "state_of_incorporation": "CA",
                "date_of_incorporation": "2019-06-01"
            })
        ),
    ]);

    let business_input = json!({ "business_data": acme_business_data() });
    let (ctx, _) = context_with_business_input(harness, business_input).await;

    let report = run(&ArticlesIncorporationAgent, &ctx).await;
    assert_eq!(
        check(&report, "Company Name Verification").status,
        CheckStatus::Passed
    );
    assert_eq!(
        check(&report, "Entity Type Verification").status,
        CheckStatus::Passed
    );
    assert_eq!(
        check(&report, "Incorporation Date Verification").status,
        CheckStatus::Passed
    );
    assert_eq!(
        check(&report, "Jurisdiction Verification").status,
        CheckStatus::Passed
    );
    assert_eq!(
        check(&report, "Articles Document Present").status,
        CheckStatus::Passed
    );
    assert_eq!(check(&report, "Legal Structure").status, CheckStatus::Passed);
}

#[tokio::test]
async fn missing_articles_still_reports_record_level_checks() {
    let business_input = json!({ "business_data": acme_business_data() });
    let (ctx, _) = context_with_business_input(Harness::default(), business_input).await;

    let report = run(&ArticlesIncorporationAgent, &ctx).await;
    assert_eq!(
        check(&report, "Articles Document Present").status,
        CheckStatus::Failed
    );
    // The persisted record still vouches for incorporation
    assert_eq!(
        check(&report, "Articles Verification").status,
        CheckStatus::Passed
    );
}

#[tokio::test]
async fn irs_match_passes_on_consistent_record() {
    let business_input = json!({ "business_data": acme_business_data() });
    let (ctx, _) = context_with_business_input(Harness::default(), business_input).await;

    let report = run(&IrsMatchAgent, &ctx).await;
    assert!(report.checks.iter().all(|c| c.status == CheckStatus::Passed));
}

#[tokio::test]
async fn bad_tax_id_fails_format_validation() {
    let mut business_data = acme_business_data();
    business_data["tax_id"] = json!("12-34567");
    let business_input = json!({ "business_data": business_data });
    let (ctx, _) = context_with_business_input(Harness::default(), business_input).await;

    let report = run(&IrsMatchAgent, &ctx).await;
    assert_eq!(
        check(&report, "Tax ID Format Validation").status,
        CheckStatus::Failed
    );
}

#[tokio::test]
async fn young_business_warns_and_stale_filings_fail() {
    let mut business_data = acme_business_data();
    let recent = (chrono::Utc::now() - chrono::Duration::days(30))
        .format("%Y-%m-%d")
        .to_string();
    business_data["incorporation_date"] = json!(recent);
    business_data["last_filing_date"] = json!("2020-01-01");
    let business_input = json!({ "business_data": business_data });
    let (ctx, _) = context_with_business_input(Harness::default(), business_input).await;

    let report = run(&SosFilingsAgent, &ctx).await;
    assert_eq!(check(&report, "Business Age").status, CheckStatus::Warning);
    assert_eq!(check(&report, "Recent Filings").status, CheckStatus::Failed);
    assert_eq!(check(&report, "SoS Registration").status, CheckStatus::Passed);
}

#[tokio::test]
async fn banned_industry_fails_normal_diligence() {
    let mut business_data = acme_business_data();
    business_data["business_type"] = json!("gambling");
    business_data["industry_type"] = json!("gambling");
    let business_input = json!({ "business_data": business_data });
    let (ctx, _) = context_with_business_input(Harness::default(), business_input).await;

    let report = run(&NormalDiligenceAgent, &ctx).await;
    assert_eq!(check(&report, "Business Type").status, CheckStatus::Failed);
    assert_eq!(check(&report, "Industry Type").status, CheckStatus::Failed);
    assert_eq!(
        check(&report, "Banned Geographics").status,
        CheckStatus::Passed
    );
}
