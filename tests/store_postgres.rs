//! PostgreSQL store behavior against a live database
//!
//! Self-skips when `TEST_DATABASE_URL` is not set.

use serde_json::json;
use verify_engine::store::{
    AgentReport, ListFilter, PgStore, VerificationKind, VerificationOutcome, VerificationStatus,
    VerificationStore,
};

async fn store_or_skip(name: &str) -> Option<PgStore> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping {}", name);
        return None;
    };
    let store = PgStore::connect(&url, 5).await.expect("database reachable");
    store.init_schema().await.expect("schema created");
    Some(store)
}

fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[tokio::test]
async fn verification_lifecycle_roundtrip() {
    let Some(store) = store_or_skip("verification_lifecycle_roundtrip").await else {
        return;
    };

    let id = fresh_id();
    let created = store
        .create_verification(&id, Some("pg-user"), None, VerificationStatus::Queued)
        .await
        .unwrap();
    assert_eq!(created.status, VerificationStatus::Queued);
    assert!(created.completed_at.is_none());

    store
        .update_verification_status(&id, VerificationStatus::Processing, None, None)
        .await
        .unwrap();

    let updated = store
        .update_verification_status(
            &id,
            VerificationStatus::Completed,
            Some(VerificationOutcome::Passed),
            Some("all checks passed"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, VerificationStatus::Completed);
    assert_eq!(updated.result, Some(VerificationOutcome::Passed));
    assert!(updated.completed_at.is_some());
}

#[tokio::test]
async fn inputs_are_date_normalized_and_results_append_in_order() {
    let Some(store) = store_or_skip("inputs_are_date_normalized_and_results_append_in_order").await
    else {
        return;
    };

    let id = fresh_id();
    store
        .create_verification(&id, Some("pg-user-2"), None, VerificationStatus::Queued)
        .await
        .unwrap();

    let stored = store
        .store_input(&id, "user", json!({ "incorporation_date": "2020/01/15" }))
        .await
        .unwrap();
    assert_eq!(stored.data["incorporation_date"], "2020-01-15");

    store
        .store_agent_result(&id, &AgentReport::success("DataAcquisitionAgent", "ok", vec![]))
        .await
        .unwrap();
    store
        .store_agent_result(&id, &AgentReport::error("IdCheckAgent", "boom"))
        .await
        .unwrap();

    let results = store.get_agent_results(&id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].id < results[1].id);
    assert_eq!(results[0].report.agent_type, "DataAcquisitionAgent");
    assert_eq!(results[1].report.agent_type, "IdCheckAgent");
}

#[tokio::test]
async fn listing_filters_by_kind_and_status() {
    let Some(store) = store_or_skip("listing_filters_by_kind_and_status").await else {
        return;
    };

    let user_verification = fresh_id();
    let business_verification = fresh_id();
    store
        .create_verification(&user_verification, Some("pg-user-3"), None, VerificationStatus::Queued)
        .await
        .unwrap();
    store
        .create_verification(
            &business_verification,
            None,
            Some("pg-biz-3"),
            VerificationStatus::Queued,
        )
        .await
        .unwrap();

    let (individuals, _) = store
        .list_verifications(
            VerificationKind::Individual,
            &ListFilter {
                status: Some(VerificationStatus::Queued),
                skip: 0,
                limit: 500,
            },
        )
        .await
        .unwrap();
    assert!(individuals
        .iter()
        .any(|v| v.verification_id == user_verification));
    assert!(individuals
        .iter()
        .all(|v| v.business_id.is_none() && v.status == VerificationStatus::Queued));
}
