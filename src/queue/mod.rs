//! Durable job queue
//!
//! A single named FIFO list in Redis plus one hash per job carrying its
//! lifecycle timestamps, status, and retained result. Delivery is
//! at-least-once: a worker that dies mid-job leaves the job hash
//! `in_progress` and redelivery comes from re-enqueueing; the workflow's
//! append-only writes make replays safe. Results are retained for the
//! configured TTL after completion.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Functions a job may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobFunction {
    IndividualVerification,
    BusinessVerification,
    SingleAgent,
}

impl JobFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndividualVerification => "individual_verification",
            Self::BusinessVerification => "business_verification",
            Self::SingleAgent => "single_agent",
        }
    }
}

impl std::str::FromStr for JobFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual_verification" => Ok(Self::IndividualVerification),
            "business_verification" => Ok(Self::BusinessVerification),
            "single_agent" => Ok(Self::SingleAgent),
            _ => Err(format!("unknown job function: {}", s)),
        }
    }
}

/// Job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Complete,
    Failed,
    NotFound,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::NotFound => "not_found",
        }
    }
}

/// A dequeued job ready to run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub function: JobFunction,
    pub args: Value,
}

/// Status snapshot for the job-status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub job_id: String,
    pub status: JobStatus,
    pub enqueue_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub result: Option<Value>,
}

/// Queue length and worker liveness for the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueInfo {
    pub queue_length: i64,
    pub worker_alive: bool,
}

/// How long the worker heartbeat key lives; a worker refreshes it every
/// poll loop, so expiry means no worker is polling
const HEARTBEAT_TTL_SECS: i64 = 90;

/// The enqueue seam the workflow engine depends on. [`JobQueue`] is the
/// production implementation; tests substitute a recorder.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Enqueue a job and return its id
    async fn dispatch(&self, function: JobFunction, args: &Value) -> Result<String>;
}

/// Redis-backed FIFO job queue
#[derive(Clone)]
pub struct JobQueue {
    conn: ConnectionManager,
    queue_name: String,
    job_timeout: Duration,
    keep_result: Duration,
}

impl JobQueue {
    /// Connect to Redis and bind the named queue
    pub async fn connect(
        redis_url: &str,
        queue_name: impl Into<String>,
        job_timeout: Duration,
        keep_result: Duration,
    ) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self {
            conn,
            queue_name: queue_name.into(),
            job_timeout,
            keep_result,
        })
    }

    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    fn job_key(&self, job_id: &str) -> String {
        format!("{}:job:{}", self.queue_name, job_id)
    }

    fn abort_key(&self, job_id: &str) -> String {
        format!("{}:abort:{}", self.queue_name, job_id)
    }

    fn heartbeat_key(&self) -> String {
        format!("{}:heartbeat", self.queue_name)
    }

    /// Enqueue a job and return its id
    pub async fn enqueue(&self, function: JobFunction, args: &Value) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        let mut conn = self.conn.clone();

        let fields: Vec<(&str, String)> = vec![
            ("function", function.as_str().to_string()),
            ("args", serde_json::to_string(args)?),
            ("status", JobStatus::Queued.as_str().to_string()),
            ("enqueue_time", Utc::now().to_rfc3339()),
        ];
        conn.hset_multiple::<_, _, _, ()>(self.job_key(&job_id), &fields)
            .await?;
        conn.rpush::<_, _, ()>(&self.queue_name, &job_id).await?;

        info!(
            "Enqueued {} job {} on queue {}",
            function.as_str(),
            job_id,
            self.queue_name
        );
        Ok(job_id)
    }

    /// Block up to `poll_timeout` for the next job. Jobs aborted while
    /// still queued are dropped here.
    pub async fn dequeue(&self, poll_timeout: Duration) -> Result<Option<Job>> {
        let mut conn = self.conn.clone();

        let popped: Option<(String, String)> = conn
            .blpop(&self.queue_name, poll_timeout.as_secs_f64())
            .await?;
        let Some((_, job_id)) = popped else {
            return Ok(None);
        };

        if conn.exists::<_, bool>(self.abort_key(&job_id)).await? {
            warn!("Job {} was aborted before start; dropping", job_id);
            self.mark_failed(&job_id, "aborted").await?;
            let _: () = conn.del(self.abort_key(&job_id)).await?;
            return Ok(None);
        }

        let fields: HashMap<String, String> = conn.hgetall(self.job_key(&job_id)).await?;
        let function: JobFunction = fields
            .get("function")
            .and_then(|f| f.parse().ok())
            .context("Dequeued job carries no function")?;
        let args: Value = fields
            .get("args")
            .map(|a| serde_json::from_str(a))
            .transpose()?
            .unwrap_or(Value::Null);

        conn.hset_multiple::<_, _, _, ()>(
            self.job_key(&job_id),
            &[
                ("status", JobStatus::InProgress.as_str().to_string()),
                ("start_time", Utc::now().to_rfc3339()),
            ],
        )
        .await?;

        Ok(Some(Job {
            job_id,
            function,
            args,
        }))
    }

    /// Record a successful result and start the retention clock
    pub async fn mark_complete(&self, job_id: &str, result: &Value) -> Result<()> {
        self.finish(job_id, JobStatus::Complete, result).await
    }

    /// Record a failure and start the retention clock
    pub async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()> {
        self.finish(
            job_id,
            JobStatus::Failed,
            &serde_json::json!({ "error": error }),
        )
        .await
    }

    async fn finish(&self, job_id: &str, status: JobStatus, result: &Value) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hset_multiple::<_, _, _, ()>(
            self.job_key(job_id),
            &[
                ("status", status.as_str().to_string()),
                ("finish_time", Utc::now().to_rfc3339()),
                ("result", serde_json::to_string(result)?),
            ],
        )
        .await?;
        conn.expire::<_, ()>(self.job_key(job_id), self.keep_result.as_secs() as i64)
            .await?;
        Ok(())
    }

    /// Status snapshot; unknown ids come back as `not_found`
    pub async fn job_status(&self, job_id: &str) -> Result<JobInfo> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(self.job_key(job_id)).await?;

        if fields.is_empty() {
            return Ok(JobInfo {
                job_id: job_id.to_string(),
                status: JobStatus::NotFound,
                enqueue_time: None,
                start_time: None,
                finish_time: None,
                result: None,
            });
        }

        let parse_time = |key: &str| {
            fields
                .get(key)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };
        let status = match fields.get("status").map(String::as_str) {
            Some("queued") => JobStatus::Queued,
            Some("in_progress") => JobStatus::InProgress,
            Some("complete") => JobStatus::Complete,
            Some("failed") => JobStatus::Failed,
            _ => JobStatus::NotFound,
        };

        Ok(JobInfo {
            job_id: job_id.to_string(),
            status,
            enqueue_time: parse_time("enqueue_time"),
            start_time: parse_time("start_time"),
            finish_time: parse_time("finish_time"),
            result: fields
                .get("result")
                .and_then(|raw| serde_json::from_str(raw).ok()),
        })
    }

    /// Best-effort abort. A queued job is dropped at dequeue; a running
    /// job keeps its lease and may still complete its current work.
    pub async fn abort(&self, job_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(self.job_key(job_id)).await?;
        if fields.is_empty() {
            return Ok(false);
        }
        conn.set_ex::<_, _, ()>(self.abort_key(job_id), "1", self.keep_result.as_secs())
            .await?;
        info!("Abort requested for job {}", job_id);
        Ok(true)
    }

    /// Queue length and worker liveness
    pub async fn queue_info(&self) -> Result<QueueInfo> {
        let mut conn = self.conn.clone();
        let queue_length: i64 = conn.llen(&self.queue_name).await?;
        let worker_alive: bool = conn.exists(self.heartbeat_key()).await?;
        Ok(QueueInfo {
            queue_length,
            worker_alive,
        })
    }

    /// Refresh the worker heartbeat; called from the worker poll loop
    pub async fn heartbeat(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.heartbeat_key(), Utc::now().to_rfc3339(), HEARTBEAT_TTL_SECS as u64)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobDispatcher for JobQueue {
    async fn dispatch(&self, function: JobFunction, args: &Value) -> Result<String> {
        self.enqueue(function, args).await
    }
}
