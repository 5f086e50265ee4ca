//! Individual workflow end-to-end behavior against in-memory fakes

mod helpers;

use std::sync::Arc;

use helpers::{passing_inquiry, FakeLlm, Harness, RecordingDispatcher};
use serde_json::json;
use verify_engine::store::{
    AgentStatus, CheckStatus, VerificationStatus, VerificationStore,
};
use verify_engine::workflow::WorkflowEngine;

async fn engine_with(
    harness: Harness,
) -> (Arc<WorkflowEngine>, Arc<verify_engine::store::memory::MemoryStore>) {
    let (deps, store) = harness.build();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    store
        .create_verification("v1", Some("u1"), None, VerificationStatus::Queued)
        .await
        .unwrap();
    (Arc::new(WorkflowEngine::new(deps, dispatcher)), store)
}

#[tokio::test]
async fn happy_path_produces_full_result_set() {
    let mut harness = Harness::default();
    harness
        .records
        .inquiry_ids
        .insert("u1".to_string(), "inq-1".to_string());
    harness.records.fraud_scores.insert(
        "u1".to_string(),
        json!({ "score": 10, "scores": { "payment_abuse": 5 } }),
    );
    harness
        .id_provider
        .inquiries
        .insert("inq-1".to_string(), passing_inquiry());

    let (engine, store) = engine_with(harness).await;

    let result = engine.run_individual("v1", "u1", None).await;
    assert_eq!(result["status"], "completed");
    assert_eq!(result["result"], "passed");

    let verification = store.get_verification("v1").await.unwrap().unwrap();
    assert_eq!(verification.status, VerificationStatus::Completed);
    assert!(verification.completed_at.is_some());
    assert_eq!(verification.result.unwrap().as_str(), "passed");

    let results = store.get_agent_results("v1").await.unwrap();
    // 1 acquisition + 10 agents + 1 compilation
    assert_eq!(results.len(), 12);
    assert_eq!(results[0].report.agent_type, "DataAcquisitionAgent");
    assert_eq!(
        results.last().unwrap().report.agent_type,
        "ResultCompilationAgent"
    );

    // Acquisition-first: every other row appends after it
    let acquisition_id = results[0].id;
    assert!(results[1..].iter().all(|row| row.id > acquisition_id));

    // The OFAC watchlist check exists and did not fail
    let ofac_check = results
        .iter()
        .flat_map(|row| row.report.checks.iter())
        .find(|check| check.name == "Watchlist (OFAC)")
        .expect("OFAC watchlist check present");
    assert_ne!(ofac_check.status, CheckStatus::Failed);
}

#[tokio::test]
async fn acquisition_failure_terminates_the_workflow() {
    let mut harness = Harness::default();
    harness.records.fail_inquiry_lookup = true;

    let (engine, store) = engine_with(harness).await;

    let result = engine.run_individual("v1", "u1", None).await;
    assert_eq!(result["status"], "failed");
    assert_eq!(result["reason"], "Data acquisition failed");

    let verification = store.get_verification("v1").await.unwrap().unwrap();
    assert_eq!(verification.status, VerificationStatus::Failed);
    assert_eq!(verification.reason.as_deref(), Some("Data acquisition failed"));
    assert!(verification.completed_at.is_some());

    // Exactly one result: the errored acquisition
    let results = store.get_agent_results("v1").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].report.agent_type, "DataAcquisitionAgent");
    assert_eq!(results[0].report.status, AgentStatus::Error);
}

#[tokio::test]
async fn compilation_is_last_and_matches_the_row_result() {
    let mut harness = Harness {
        llm: FakeLlm::deciding("failed"),
        ..Harness::default()
    };
    harness
        .records
        .inquiry_ids
        .insert("u1".to_string(), "inq-1".to_string());
    harness
        .id_provider
        .inquiries
        .insert("inq-1".to_string(), passing_inquiry());

    let (engine, store) = engine_with(harness).await;
    engine.run_individual("v1", "u1", None).await;

    let results = store.get_agent_results("v1").await.unwrap();
    let compilations: Vec<_> = results
        .iter()
        .filter(|row| row.report.agent_type == "ResultCompilationAgent")
        .collect();
    assert_eq!(compilations.len(), 1);
    assert_eq!(compilations[0].id, results.last().unwrap().id);

    let verification = store.get_verification("v1").await.unwrap().unwrap();
    assert_eq!(
        compilations[0].report.extra_str("verification_result"),
        Some(verification.result.unwrap().as_str())
    );
}

#[tokio::test]
async fn provider_gaps_do_not_stop_the_fan_out() {
    // No inquiry on record and no fraud scores: agents see empty inputs,
    // emit failed/not_applicable checks, and compilation still runs
    let (engine, store) = engine_with(Harness::default()).await;

    let result = engine.run_individual("v1", "u1", None).await;
    assert_eq!(result["status"], "completed");

    let results = store.get_agent_results("v1").await.unwrap();
    assert_eq!(results.len(), 12);
    assert!(results
        .iter()
        .all(|row| row.report.status != AgentStatus::Error));
}
