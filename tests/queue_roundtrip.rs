//! Job queue behavior against a live Redis
//!
//! These tests self-skip when `REDIS_URL` is not set so the suite runs
//! without external services.

use std::time::Duration;

use serde_json::json;
use verify_engine::queue::{JobFunction, JobQueue, JobStatus};

async fn queue_or_skip(name: &str) -> Option<JobQueue> {
    let Ok(url) = std::env::var("REDIS_URL") else {
        eprintln!("REDIS_URL not set; skipping {}", name);
        return None;
    };
    let queue_name = format!("test_queue_{}", uuid::Uuid::new_v4().simple());
    Some(
        JobQueue::connect(
            &url,
            queue_name,
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
        .await
        .expect("redis reachable"),
    )
}

#[tokio::test]
async fn enqueue_dequeue_complete_roundtrip() {
    let Some(queue) = queue_or_skip("enqueue_dequeue_complete_roundtrip").await else {
        return;
    };

    let args = json!({ "verification_id": "v1", "user_id": "u1" });
    let job_id = queue
        .enqueue(JobFunction::IndividualVerification, &args)
        .await
        .unwrap();

    let info = queue.job_status(&job_id).await.unwrap();
    assert_eq!(info.status, JobStatus::Queued);
    assert!(info.enqueue_time.is_some());

    let job = queue
        .dequeue(Duration::from_secs(2))
        .await
        .unwrap()
        .expect("job delivered");
    assert_eq!(job.job_id, job_id);
    assert_eq!(job.function, JobFunction::IndividualVerification);
    assert_eq!(job.args, args);

    let info = queue.job_status(&job_id).await.unwrap();
    assert_eq!(info.status, JobStatus::InProgress);
    assert!(info.start_time.is_some());

    queue
        .mark_complete(&job_id, &json!({ "status": "completed" }))
        .await
        .unwrap();
    let info = queue.job_status(&job_id).await.unwrap();
    assert_eq!(info.status, JobStatus::Complete);
    assert!(info.finish_time.is_some());
    assert_eq!(info.result.unwrap()["status"], "completed");
}

#[tokio::test]
async fn fifo_order_is_preserved() {
    let Some(queue) = queue_or_skip("fifo_order_is_preserved").await else {
        return;
    };

    let first = queue
        .enqueue(JobFunction::IndividualVerification, &json!({ "n": 1 }))
        .await
        .unwrap();
    let second = queue
        .enqueue(JobFunction::BusinessVerification, &json!({ "n": 2 }))
        .await
        .unwrap();

    let a = queue.dequeue(Duration::from_secs(2)).await.unwrap().unwrap();
    let b = queue.dequeue(Duration::from_secs(2)).await.unwrap().unwrap();
    assert_eq!(a.job_id, first);
    assert_eq!(b.job_id, second);
}

#[tokio::test]
async fn unknown_job_reads_not_found() {
    let Some(queue) = queue_or_skip("unknown_job_reads_not_found").await else {
        return;
    };
    let info = queue.job_status("no-such-job").await.unwrap();
    assert_eq!(info.status, JobStatus::NotFound);
}

#[tokio::test]
async fn aborted_queued_job_is_dropped_at_dequeue() {
    let Some(queue) = queue_or_skip("aborted_queued_job_is_dropped_at_dequeue").await else {
        return;
    };

    let job_id = queue
        .enqueue(JobFunction::SingleAgent, &json!({ "agent_type": "IdCheckAgent" }))
        .await
        .unwrap();
    assert!(queue.abort(&job_id).await.unwrap());

    // The dequeue consumes and drops the aborted job
    let delivered = queue.dequeue(Duration::from_secs(2)).await.unwrap();
    assert!(delivered.is_none());

    let info = queue.job_status(&job_id).await.unwrap();
    assert_eq!(info.status, JobStatus::Failed);
}
