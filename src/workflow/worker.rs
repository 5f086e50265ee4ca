//! Queue worker
//!
//! Pulls jobs off the durable queue and dispatches them to the workflow
//! engine. Up to `max_workers` jobs run concurrently per process; each job
//! runs under the queue's job timeout. A timed-out job is recorded as a
//! job failure; the verification row may legitimately still read
//! `processing`; the queue, not the database, is the source of truth for
//! in-flight work.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::queue::{Job, JobFunction, JobQueue};

use super::WorkflowEngine;

/// How long each poll blocks before refreshing the heartbeat
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Queue consumer driving the workflow engine
pub struct Worker {
    queue: JobQueue,
    engine: Arc<WorkflowEngine>,
    max_workers: usize,
}

impl Worker {
    pub fn new(queue: JobQueue, engine: Arc<WorkflowEngine>, max_workers: usize) -> Self {
        Self {
            queue,
            engine,
            max_workers: max_workers.max(1),
        }
    }

    /// Poll and dispatch until the task is aborted
    pub async fn run(&self) -> Result<()> {
        info!("Worker started with {} slots", self.max_workers);
        let slots = Arc::new(Semaphore::new(self.max_workers));

        loop {
            if let Err(e) = self.queue.heartbeat().await {
                warn!("Heartbeat write failed: {}", e);
            }

            let job = match self.queue.dequeue(POLL_TIMEOUT).await {
                Ok(Some(job)) => job,
                Ok(None) => continue,
                Err(e) => {
                    error!("Dequeue failed: {}; backing off", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let permit = slots.clone().acquire_owned().await?;
            let queue = self.queue.clone();
            let engine = self.engine.clone();
            tokio::spawn(async move {
                let _permit = permit;
                Self::process(queue, engine, job).await;
            });
        }
    }

    /// Run one job to completion, recording its outcome on the queue
    async fn process(queue: JobQueue, engine: Arc<WorkflowEngine>, job: Job) {
        info!("Processing job {} ({})", job.job_id, job.function.as_str());

        let outcome =
            tokio::time::timeout(queue.job_timeout(), Self::dispatch(&engine, &job)).await;

        match outcome {
            Ok(Ok(result)) => {
                if let Err(e) = queue.mark_complete(&job.job_id, &result).await {
                    error!("Failed to record result for job {}: {}", job.job_id, e);
                }
            }
            Ok(Err(e)) => {
                error!("Job {} failed: {:#}", job.job_id, e);
                if let Err(record_error) = queue.mark_failed(&job.job_id, &e.to_string()).await {
                    error!(
                        "Failed to record failure for job {}: {}",
                        job.job_id, record_error
                    );
                }
            }
            Err(_) => {
                error!("Job {} exceeded the job timeout", job.job_id);
                if let Err(record_error) = queue
                    .mark_failed(&job.job_id, "job timeout exceeded")
                    .await
                {
                    error!(
                        "Failed to record timeout for job {}: {}",
                        job.job_id, record_error
                    );
                }
            }
        }
    }

    async fn dispatch(engine: &WorkflowEngine, job: &Job) -> Result<Value> {
        let args = &job.args;
        let verification_id = args["verification_id"]
            .as_str()
            .ok_or_else(|| anyhow!("job {} carries no verification_id", job.job_id))?;
        let additional_data = match &args["additional_data"] {
            Value::Null => None,
            other => Some(other.clone()),
        };

        match job.function {
            JobFunction::IndividualVerification => {
                let user_id = args["user_id"]
                    .as_str()
                    .ok_or_else(|| anyhow!("individual job carries no user_id"))?;
                Ok(engine
                    .run_individual(verification_id, user_id, additional_data)
                    .await)
            }
            JobFunction::BusinessVerification => {
                let business_id = args["business_id"]
                    .as_str()
                    .ok_or_else(|| anyhow!("business job carries no business_id"))?;
                Ok(engine
                    .run_business(verification_id, business_id, additional_data)
                    .await)
            }
            JobFunction::SingleAgent => {
                let agent_type = args["agent_type"]
                    .as_str()
                    .ok_or_else(|| anyhow!("single-agent job carries no agent_type"))?;
                let report = engine.run_single_agent(verification_id, agent_type).await?;
                Ok(json!({ "status": "completed", "report": report }))
            }
        }
    }
}
