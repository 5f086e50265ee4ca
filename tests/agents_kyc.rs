//! Individual-agent check semantics

mod helpers;

use std::sync::Arc;

use helpers::{passing_inquiry, Harness};
use serde_json::{json, Value};
use verify_engine::agents::kyc::{
    EmailPhoneIpVerificationAgent, GovtIdVerificationAgent, IdSelfieVerificationAgent,
    LoginActivitiesAgent, OfacVerificationAgent, PaymentBehaviorAgent, SiftVerificationAgent,
};
use verify_engine::agents::{run_agent, Agent, AgentContext};
use verify_engine::store::memory::MemoryStore;
use verify_engine::store::{AgentReport, AgentStatus, Check, CheckStatus, VerificationStatus, VerificationStore};

async fn context_with_user_input(
    harness: Harness,
    user_input: Value,
) -> (AgentContext, Arc<MemoryStore>) {
    let (deps, store) = harness.build();
    store
        .create_verification("v1", Some("u1"), None, VerificationStatus::Queued)
        .await
        .unwrap();
    store.store_input("v1", "user", user_input).await.unwrap();
    let ctx = AgentContext::new("v1", deps).with_user("u1");
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

#[tokio::test]
async fn impossible_travel_fails_login_location_analysis() {
    let user_input = json!({
        "user_data": {
            "user_id": "u1",
            "login_activities": [
                { "location": "Tokyo", "date": "2025-05-01T10:00:00Z", "device": "phone", "ip": "8.8.8.8" },
                { "location": "Berlin", "date": "2025-05-01T10:30:00Z", "device": "phone", "ip": "8.8.4.4" }
            ]
        },
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&LoginActivitiesAgent, &ctx).await;
    let location = check(&report, "Login Location Analysis");
    assert_eq!(location.status, CheckStatus::Failed);
    assert!(location.details.contains("Impossible travel detected: true"));
}

#[tokio::test]
async fn same_location_logins_pass_travel_analysis() {
    let user_input = json!({
        "user_data": {
            "login_activities": [
                { "location": "Tokyo", "date": "2025-05-01T10:00:00Z" },
                { "location": "Tokyo", "date": "2025-05-01T10:30:00Z" },
                { "location": "Berlin", "date": "2025-05-02T10:00:00Z" }
            ]
        },
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&LoginActivitiesAgent, &ctx).await;
    assert_eq!(
        check(&report, "Login Location Analysis").status,
        CheckStatus::Passed
    );
}

#[tokio::test]
async fn excessive_failed_logins_fail() {
    let failed_login = json!({ "type": "login", "status": "failure" });
    let user_input = json!({
        "user_data": { "login_activities": [] },
        "sift_data": { "user": { "activities": [failed_login, failed_login, failed_login, failed_login] } }
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&LoginActivitiesAgent, &ctx).await;
    assert_eq!(
        check(&report, "Login Failure Analysis").status,
        CheckStatus::Failed
    );
}

#[tokio::test]
async fn rapid_transactions_fail_pattern_analysis() {
    // Three transactions inside eight minutes, one above the large-amount
    // threshold
    let user_input = json!({
        "user_data": {
            "bank_accounts": [{
                "verified": true,
                "last_transactions": [
                    { "amount": 6000, "date": "2025-05-01T10:00:00Z" },
                    { "amount": 120, "date": "2025-05-01T10:04:00Z" },
                    { "amount": 80, "date": "2025-05-01T10:08:00Z" }
                ]
            }]
        },
        "sift_data": { "scores": { "payment_abuse": 10 } }
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&PaymentBehaviorAgent, &ctx).await;
    assert_eq!(
        check(&report, "Transaction Pattern Analysis").status,
        CheckStatus::Failed
    );
    assert_eq!(
        check(&report, "Bank Account Verification").status,
        CheckStatus::Passed
    );
}

#[tokio::test]
async fn no_transactions_is_not_applicable() {
    let user_input = json!({
        "user_data": { "bank_accounts": [{ "verified": true }] },
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&PaymentBehaviorAgent, &ctx).await;
    assert_eq!(
        check(&report, "Transaction Pattern Analysis").status,
        CheckStatus::NotApplicable
    );
}

#[tokio::test]
async fn payment_abuse_over_threshold_fails() {
    let user_input = json!({
        "user_data": { "bank_accounts": [] },
        "sift_data": { "scores": { "payment_abuse": 72 } }
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&PaymentBehaviorAgent, &ctx).await;
    assert_eq!(
        check(&report, "Sift Payment Abuse Score").status,
        CheckStatus::Failed
    );
}

#[tokio::test]
async fn disposable_email_domain_fails_email_verification() {
    let user_input = json!({
        "user_data": {
            "email": "someone@tempmail.com",
            "phone": "+14155552671",
            "login_activities": [{ "ip": "8.8.8.8" }]
        },
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&EmailPhoneIpVerificationAgent, &ctx).await;
    assert_eq!(check(&report, "Email Verification").status, CheckStatus::Failed);
    assert_eq!(check(&report, "Phone Verification").status, CheckStatus::Passed);
    assert_eq!(check(&report, "IP Verification").status, CheckStatus::Passed);
}

#[tokio::test]
async fn malformed_phone_fails_phone_verification() {
    let user_input = json!({
        "user_data": { "email": "a@example.com", "phone": "415-555-2671" },
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&EmailPhoneIpVerificationAgent, &ctx).await;
    assert_eq!(check(&report, "Phone Verification").status, CheckStatus::Failed);
}

#[tokio::test]
async fn sift_thresholds_drive_all_three_checks() {
    let user_input = json!({
        "user_data": {},
        "sift_data": {
            "score": 85,
            "user": {
                "network": {
                    "risk_score": 70,
                    "associated_users": [{}, {}, {}, {}]
                },
                "activities": [
                    { "type": "chargeback", "status": "success" }
                ]
            }
        }
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&SiftVerificationAgent, &ctx).await;
    assert_eq!(check(&report, "Sift Score").status, CheckStatus::Failed);
    assert_eq!(check(&report, "Sift network").status, CheckStatus::Failed);
    assert_eq!(check(&report, "Sift Activities").status, CheckStatus::Failed);
}

#[tokio::test]
async fn quiet_sift_profile_passes() {
    let user_input = json!({
        "user_data": {},
        "sift_data": {
            "score": 20,
            "user": {
                "network": { "risk_score": 10, "associated_users": [] },
                "activities": [{ "type": "login", "status": "success" }]
            }
        }
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&SiftVerificationAgent, &ctx).await;
    assert!(report.checks.iter().all(|c| c.status == CheckStatus::Passed));
}

#[tokio::test]
async fn sanctioned_country_fails_country_check() {
    let user_input = json!({
        "user_data": {
            "name": "Test Subject",
            "address": { "street": "1 Main St", "country": "KP" }
        },
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&OfacVerificationAgent, &ctx).await;
    assert_eq!(
        check(&report, "Country Sanctions Check").status,
        CheckStatus::Failed
    );
    assert_eq!(
        check(&report, "OFAC Sanctions List Match").status,
        CheckStatus::Passed
    );
}

#[tokio::test]
async fn sanctions_hit_fails_match_check() {
    let mut harness = Harness::default();
    harness.sanctions.entities.insert(
        "bad actor".to_string(),
        vec![json!({ "name": "Bad Actor", "type": "person", "source": "SDN", "sourceID": "1" })],
    );
    let user_input = json!({
        "user_data": { "name": "Bad Actor", "address": { "country": "US" } },
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(harness, user_input).await;

    let report = run(&OfacVerificationAgent, &ctx).await;
    assert_eq!(
        check(&report, "OFAC Sanctions List Match").status,
        CheckStatus::Failed
    );
    assert_eq!(
        check(&report, "High Risk OFAC Match").status,
        CheckStatus::Failed
    );
    assert_eq!(report.extras["ofac_matches"], 1);
}

#[tokio::test]
async fn missing_provider_results_are_not_applicable() {
    let user_input = json!({ "user_data": {}, "persona_data": {}, "sift_data": {} });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&GovtIdVerificationAgent, &ctx).await;
    assert_eq!(report.checks.len(), 14);
    assert!(report
        .checks
        .iter()
        .all(|c| c.status == CheckStatus::NotApplicable));
}

#[tokio::test]
async fn selfie_confidence_threshold_gates_the_match() {
    let mut inquiry = passing_inquiry();
    // Degrade the provider confidence below the 0.7 floor
    let included = inquiry["included"].as_array_mut().unwrap();
    for item in included.iter_mut() {
        if item["type"] == "verification/government-id" {
            for provider_check in item["checks"].as_array_mut().unwrap() {
                if provider_check["name"] == "id_selfie_comparison" {
                    provider_check["metadata"]["confidence-score"] = json!(0.55);
                }
            }
        }
    }
    let user_input = json!({ "user_data": {}, "persona_data": inquiry, "sift_data": {} });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&IdSelfieVerificationAgent, &ctx).await;
    assert_eq!(
        check(&report, "ID to Selfie Comparison").status,
        CheckStatus::Failed
    );
    assert_eq!(check(&report, "Facial Anomalies").status, CheckStatus::Failed);
}

#[tokio::test]
async fn high_confidence_selfie_passes() {
    let user_input = json!({
        "user_data": {},
        "persona_data": passing_inquiry(),
        "sift_data": {}
    });
    let (ctx, _) = context_with_user_input(Harness::default(), user_input).await;

    let report = run(&IdSelfieVerificationAgent, &ctx).await;
    assert_eq!(
        check(&report, "ID to Selfie Comparison").status,
        CheckStatus::Passed
    );
}
