//! Business workflow: UBO fan-out, join behavior, and compilation inputs

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{business_inquiry, Harness, RecordingDispatcher};
use serde_json::json;
use verify_engine::queue::JobFunction;
use verify_engine::store::memory::MemoryStore;
use verify_engine::store::{VerificationStatus, VerificationStore};
use verify_engine::workflow::{JoinConfig, WorkflowEngine};

fn short_join() -> JoinConfig {
    JoinConfig {
        poll_interval: Duration::from_millis(50),
        deadline: Duration::from_millis(1500),
    }
}

async fn business_engine(
    harness: Harness,
) -> (
    Arc<WorkflowEngine>,
    Arc<MemoryStore>,
    Arc<RecordingDispatcher>,
) {
    let (deps, store) = harness.build();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    store
        .create_verification("vb1", None, Some("b1"), VerificationStatus::Queued)
        .await
        .unwrap();
    let engine = Arc::new(
        WorkflowEngine::new(deps, dispatcher.clone()).with_join_config(short_join()),
    );
    (engine, store, dispatcher)
}

fn business_record_with_owners(owners: Vec<serde_json::Value>) -> Harness {
    let mut harness = Harness::default();
    harness.records.business_records.insert(
        "b1".to_string(),
        json!({
            "id": "b1",
            "user_id": "owner-user",
            "business_name": "Acme Holdings LLC",
            "business_type": "llc",
            "tax_id": "12-3456789",
            "ein_owner_name": "Acme Holdings LLC",
            "legal_structure": "LLC",
            "good_standing": true,
            "tax_id_verified": true,
            "sos_filing_status": "active",
            "incorporation_date": "2019-06-01",
            "last_filing_date": "2025-06-01",
        }),
    );
    harness
        .records
        .inquiry_ids
        .insert("owner-user".to_string(), "inq-biz".to_string());
    harness.id_provider.inquiries.insert(
        "inq-biz".to_string(),
        business_inquiry("Acme Holdings LLC", "12-3456789"),
    );
    harness
        .records
        .business_owners
        .insert("b1".to_string(), owners);
    harness
}

#[tokio::test]
async fn zero_ubos_completes_without_children() {
    let harness = business_record_with_owners(vec![]);
    let (engine, store, dispatcher) = business_engine(harness).await;

    let result = engine.run_business("vb1", "b1", None).await;
    assert_eq!(result["status"], "completed");
    assert_eq!(result["ubo_verifications"], json!([]));

    assert!(dispatcher.dispatched().is_empty());
    assert!(store.get_ubo_links("vb1").await.unwrap().is_empty());

    let verification = store.get_verification("vb1").await.unwrap().unwrap();
    assert_eq!(verification.status, VerificationStatus::Completed);
}

#[tokio::test]
async fn ubo_without_user_id_is_skipped() {
    let harness = business_record_with_owners(vec![
        json!({ "kyb_id": "b1", "owner_inquiry_id": "inq-ubo-a" }),
        json!({ "kyb_id": "b1", "created_for_id": "ubo-user-a" }),
    ]);
    let (engine, store, dispatcher) = business_engine(harness).await;

    let result = engine.run_business("vb1", "b1", None).await;
    assert_eq!(result["status"], "completed");

    // Only the UBO with a usable user id produced a child
    let jobs = dispatcher.dispatched();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].0, JobFunction::IndividualVerification);
    assert_eq!(jobs[0].1["user_id"], "ubo-user-a");

    let links = store.get_ubo_links("vb1").await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].ubo_user_id, "ubo-user-a");
}

#[tokio::test]
async fn ubo_children_are_linked_and_enqueued_with_parent_context() {
    let harness = business_record_with_owners(vec![
        json!({ "kyb_id": "b1", "created_for_id": "ubo-a" }),
        json!({ "kyb_id": "b1", "created_for_id": "ubo-b" }),
    ]);
    let (engine, store, dispatcher) = business_engine(harness).await;

    engine.run_business("vb1", "b1", None).await;

    let links = store.get_ubo_links("vb1").await.unwrap();
    assert_eq!(links.len(), 2);

    for (function, args) in dispatcher.dispatched() {
        assert_eq!(function, JobFunction::IndividualVerification);
        assert_eq!(args["additional_data"]["parent_business_id"], "b1");
        assert_eq!(args["additional_data"]["ubo_role"], "UBO");

        // Each enqueued child exists as a queued individual verification
        let child_id = args["verification_id"].as_str().unwrap();
        let child = store.get_verification(child_id).await.unwrap().unwrap();
        assert!(child.user_id.is_some());
        assert!(child.business_id.is_none());
    }
}

#[tokio::test]
async fn join_timeout_does_not_fail_the_parent() {
    let harness = business_record_with_owners(vec![
        json!({ "kyb_id": "b1", "created_for_id": "ubo-a" }),
        json!({ "kyb_id": "b1", "created_for_id": "ubo-b" }),
    ]);
    let (engine, store, dispatcher) = business_engine(harness).await;

    // Drive the parent in the background so a UBO child can be completed
    // mid-join
    let parent = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_business("vb1", "b1", None).await })
    };

    // Wait for both children to be enqueued
    let jobs = loop {
        let jobs = dispatcher.dispatched();
        if jobs.len() == 2 {
            break jobs;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    // Complete child A; leave child B in `queued` past the join deadline
    let child_a = jobs[0].1["verification_id"].as_str().unwrap().to_string();
    let user_a = jobs[0].1["user_id"].as_str().unwrap().to_string();
    engine.run_individual(&child_a, &user_a, None).await;

    let result = parent.await.unwrap();
    assert_eq!(result["status"], "completed");

    // Compilation saw both children with their last-known statuses
    let results = store.get_agent_results("vb1").await.unwrap();
    let compilation = results
        .iter()
        .find(|row| row.report.agent_type == "BusinessResultCompilationAgent")
        .expect("business compilation present");
    let ubo_results = compilation.report.extras["ubo_results"].as_array().unwrap();
    assert_eq!(ubo_results.len(), 2);

    let statuses: Vec<&str> = ubo_results
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"completed"));
    assert!(statuses.contains(&"queued"));

    let parent_row = store.get_verification("vb1").await.unwrap().unwrap();
    assert_eq!(parent_row.status, VerificationStatus::Completed);
}

#[tokio::test]
async fn business_results_include_all_five_agents() {
    let harness = business_record_with_owners(vec![]);
    let (engine, store, _) = business_engine(harness).await;

    engine.run_business("vb1", "b1", None).await;

    let results = store.get_agent_results("vb1").await.unwrap();
    let agent_types: Vec<&str> = results
        .iter()
        .map(|row| row.report.agent_type.as_str())
        .collect();
    for expected in [
        "DataAcquisitionAgent",
        "NormalDiligenceAgent",
        "IrsMatchAgent",
        "SosFilingsAgent",
        "EinLetterAgent",
        "ArticlesIncorporationAgent",
        "BusinessResultCompilationAgent",
    ] {
        assert!(
            agent_types.contains(&expected),
            "missing result for {}",
            expected
        );
    }
}
