//! Workflow engine
//!
//! Drives the two verification state machines. Transitions are made by the
//! worker that owns the job, never by the API: `queued -> processing ->
//! (completed | failed)`. Acquisition happens before everything else; the
//! remaining agents fan out concurrently with exceptions materialized as
//! error results; compilation runs last and its decision is written as the
//! terminal transition by this engine.

use anyhow::{anyhow, Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{
    business_agents, individual_agents, run_agent, Agent, AgentContext,
    BusinessResultCompilationAgent, DataAcquisitionAgent, EngineDeps, ResultCompilationAgent,
};
use crate::queue::{JobDispatcher, JobFunction};
use crate::store::{
    AgentReport, AgentStatus, VerificationOutcome, VerificationStatus, VerificationStore,
};

pub mod worker;

pub use worker::Worker;

/// How UBO children are awaited before business compilation
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// How often child statuses are polled
    pub poll_interval: Duration,
    /// Hard cap on waiting; on expiry compilation proceeds with the
    /// children's last-known statuses
    pub deadline: Duration,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            deadline: Duration::from_secs(30 * 60),
        }
    }
}

/// The verification workflow engine
pub struct WorkflowEngine {
    deps: Arc<EngineDeps>,
    queue: Arc<dyn JobDispatcher>,
    join_config: JoinConfig,
}

impl WorkflowEngine {
    pub fn new(deps: Arc<EngineDeps>, queue: Arc<dyn JobDispatcher>) -> Self {
        Self {
            deps,
            queue,
            join_config: JoinConfig::default(),
        }
    }

    pub fn with_join_config(mut self, join_config: JoinConfig) -> Self {
        self.join_config = join_config;
        self
    }

    pub fn deps(&self) -> &Arc<EngineDeps> {
        &self.deps
    }

    /// Run the individual workflow to its terminal state. Never returns an
    /// error for workflow-level failures; those are recorded on the
    /// verification row and reflected in the returned job result.
    pub async fn run_individual(
        &self,
        verification_id: &str,
        user_id: &str,
        additional_data: Option<Value>,
    ) -> Value {
        match self
            .individual_inner(verification_id, user_id, additional_data)
            .await
        {
            Ok(result) => result,
            Err(e) => self.record_crash(verification_id, e).await,
        }
    }

    /// Run the business workflow to its terminal state
    pub async fn run_business(
        &self,
        verification_id: &str,
        business_id: &str,
        additional_data: Option<Value>,
    ) -> Value {
        match self
            .business_inner(verification_id, business_id, additional_data)
            .await
        {
            Ok(result) => result,
            Err(e) => self.record_crash(verification_id, e).await,
        }
    }

    /// Run one named agent against an existing verification
    pub async fn run_single_agent(&self, verification_id: &str, agent_type: &str) -> Result<Value> {
        let agent = individual_agents()
            .into_iter()
            .chain(business_agents())
            .find(|a| a.agent_type() == agent_type)
            .ok_or_else(|| anyhow!("unknown agent type: {}", agent_type))?;

        let verification = self
            .deps
            .store
            .get_verification(verification_id)
            .await?
            .ok_or_else(|| anyhow!("verification {} not found", verification_id))?;

        let mut ctx = AgentContext::new(verification_id, self.deps.clone());
        if let Some(user_id) = &verification.user_id {
            ctx = ctx.with_user(user_id.clone());
        }
        if let Some(business_id) = &verification.business_id {
            ctx = ctx.with_business(business_id.clone());
        }

        let report = run_agent(agent.as_ref(), &ctx).await;
        self.deps
            .store
            .store_agent_result(verification_id, &report)
            .await?;
        Ok(serde_json::to_value(&report)?)
    }

    async fn individual_inner(
        &self,
        verification_id: &str,
        user_id: &str,
        additional_data: Option<Value>,
    ) -> Result<Value> {
        info!("Starting individual verification workflow {}", verification_id);
        self.deps
            .store
            .update_verification_status(verification_id, VerificationStatus::Processing, None, None)
            .await?;

        let ctx = AgentContext::new(verification_id, self.deps.clone())
            .with_user(user_id)
            .with_additional_data(additional_data);

        if !self.acquire_data(verification_id, &ctx).await? {
            return Ok(json!({ "status": "failed", "reason": "Data acquisition failed" }));
        }

        self.fan_out(verification_id, &ctx, individual_agents()).await?;

        let decision = self
            .compile(verification_id, &ctx, &ResultCompilationAgent)
            .await?;
        Ok(decision)
    }

    async fn business_inner(
        &self,
        verification_id: &str,
        business_id: &str,
        additional_data: Option<Value>,
    ) -> Result<Value> {
        info!("Starting business verification workflow {}", verification_id);
        self.deps
            .store
            .update_verification_status(verification_id, VerificationStatus::Processing, None, None)
            .await?;

        let ctx = AgentContext::new(verification_id, self.deps.clone())
            .with_business(business_id)
            .with_additional_data(additional_data);

        if !self.acquire_data(verification_id, &ctx).await? {
            return Ok(json!({ "status": "failed", "reason": "Data acquisition failed" }));
        }

        let ubo_verification_ids = self
            .spawn_ubo_verifications(verification_id, business_id)
            .await?;

        self.fan_out(verification_id, &ctx, business_agents()).await?;

        self.join_ubo_verifications(&ubo_verification_ids).await?;

        let ctx = ctx.with_ubo_verifications(ubo_verification_ids.clone());
        let mut decision = self
            .compile(verification_id, &ctx, &BusinessResultCompilationAgent)
            .await?;
        if let Some(map) = decision.as_object_mut() {
            map.insert("ubo_verifications".to_string(), json!(ubo_verification_ids));
        }
        Ok(decision)
    }

    /// Step 2 of both workflows. Returns false when acquisition errored and
    /// the verification was terminally failed.
    async fn acquire_data(&self, verification_id: &str, ctx: &AgentContext) -> Result<bool> {
        let report = run_agent(&DataAcquisitionAgent, ctx).await;
        let failed = report.status == AgentStatus::Error;
        self.deps
            .store
            .store_agent_result(verification_id, &report)
            .await?;

        if failed {
            error!(
                "Data acquisition failed for verification {}: {}",
                verification_id, report.details
            );
            self.deps
                .store
                .update_verification_status(
                    verification_id,
                    VerificationStatus::Failed,
                    Some(VerificationOutcome::Failed),
                    Some("Data acquisition failed"),
                )
                .await?;
        }
        Ok(!failed)
    }

    /// Fan out a set of agents as independent tasks. A panicking task is
    /// materialized as an error result; siblings are never cancelled.
    /// Results are appended in wall-clock completion order.
    async fn fan_out(
        &self,
        verification_id: &str,
        ctx: &AgentContext,
        agents: Vec<Arc<dyn Agent>>,
    ) -> Result<()> {
        info!(
            "Executing {} verification agents in parallel for {}",
            agents.len(),
            verification_id
        );

        let mut tasks = FuturesUnordered::new();
        for agent in agents {
            let agent_type = agent.agent_type();
            let task_ctx = ctx.clone();
            let handle =
                tokio::spawn(async move { run_agent(agent.as_ref(), &task_ctx).await });
            tasks.push(async move { (agent_type, handle.await) });
        }

        while let Some((agent_type, joined)) = tasks.next().await {
            let report = match joined {
                Ok(report) => report,
                Err(e) => {
                    error!("Agent {} task failed: {}", agent_type, e);
                    AgentReport::error(agent_type, format!("Agent execution error: {}", e))
                }
            };
            info!(
                "Agent {} completed with status {}",
                report.agent_type,
                report.status.as_str()
            );
            self.deps
                .store
                .store_agent_result(verification_id, &report)
                .await?;
        }
        Ok(())
    }

    /// Create, link, and enqueue a child verification per usable UBO. The
    /// link row is committed before the enqueue so crash recovery can see
    /// orphaned children.
    async fn spawn_ubo_verifications(
        &self,
        verification_id: &str,
        business_id: &str,
    ) -> Result<Vec<String>> {
        let business_inputs = self
            .deps
            .store
            .get_inputs(verification_id, Some("business"))
            .await?;
        let ubos = business_inputs
            .last()
            .map(|input| input.data["ubos"].clone())
            .unwrap_or(Value::Null);
        let ubos = ubos.as_array().cloned().unwrap_or_default();

        info!(
            "Found {} UBOs for business verification {}",
            ubos.len(),
            verification_id
        );

        let mut child_ids = Vec::new();
        for ubo in ubos {
            let ubo_user_id = ubo["ubo_info"]["created_for_id"]
                .as_str()
                .or_else(|| ubo["kyc_data"]["user_data"]["user_id"].as_str())
                .unwrap_or_default()
                .to_string();
            if ubo_user_id.is_empty() {
                warn!(
                    "Skipping UBO without a user id on verification {}",
                    verification_id
                );
                continue;
            }

            let child_id = Uuid::new_v4().to_string();
            self.deps
                .store
                .create_verification(&child_id, Some(&ubo_user_id), None, VerificationStatus::Queued)
                .await?;
            self.deps
                .store
                .store_ubo_link(verification_id, &ubo_user_id, &child_id)
                .await?;

            self.queue
                .dispatch(
                    JobFunction::IndividualVerification,
                    &json!({
                        "verification_id": &child_id,
                        "user_id": &ubo_user_id,
                        "additional_data": {
                            "ubo_info": ubo["ubo_info"].clone(),
                            "parent_business_id": business_id,
                            "ubo_role": "UBO",
                        },
                    }),
                )
                .await?;

            info!("Queued UBO verification {} for user {}", child_id, ubo_user_id);
            child_ids.push(child_id);
        }

        Ok(child_ids)
    }

    /// Wait for the UBO children under the join deadline. A timeout does
    /// not fail the parent; compilation proceeds with whatever statuses
    /// exist.
    async fn join_ubo_verifications(&self, child_ids: &[String]) -> Result<()> {
        if child_ids.is_empty() {
            return Ok(());
        }
        info!("Waiting for {} UBO verifications to complete", child_ids.len());

        let deadline = tokio::time::Instant::now() + self.join_config.deadline;
        loop {
            let mut terminal = 0;
            for child_id in child_ids {
                if let Some(child) = self.deps.store.get_verification(child_id).await? {
                    if child.status.is_terminal() {
                        terminal += 1;
                    }
                }
            }
            if terminal == child_ids.len() {
                info!("All {} UBO verifications completed", child_ids.len());
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    "Timeout waiting for UBO verifications; {}/{} terminal",
                    terminal,
                    child_ids.len()
                );
                return Ok(());
            }
            info!(
                "Waiting for UBO verifications: {}/{} completed",
                terminal,
                child_ids.len()
            );
            tokio::time::sleep(self.join_config.poll_interval).await;
        }
    }

    /// Run the compilation agent and write the terminal verification row
    /// from its decision. This is the only place the terminal transition
    /// happens.
    async fn compile(
        &self,
        verification_id: &str,
        ctx: &AgentContext,
        agent: &dyn Agent,
    ) -> Result<Value> {
        let report = run_agent(agent, ctx).await;
        self.deps
            .store
            .store_agent_result(verification_id, &report)
            .await?;

        let outcome = report
            .extra_str("verification_result")
            .and_then(|raw| raw.parse::<VerificationOutcome>().ok())
            .unwrap_or(VerificationOutcome::Failed);
        let reasoning = report.extra_str("reasoning").unwrap_or_default().to_string();

        self.deps
            .store
            .update_verification_status(
                verification_id,
                VerificationStatus::Completed,
                Some(outcome),
                Some(&reasoning),
            )
            .await?;

        info!(
            "Verification {} completed with result {}",
            verification_id,
            outcome.as_str()
        );

        Ok(json!({
            "status": "completed",
            "verification_id": verification_id,
            "result": outcome.as_str(),
            "reasoning": reasoning,
        }))
    }

    /// Unhandled engine failure: mark the row failed with the crash reason
    async fn record_crash(&self, verification_id: &str, e: anyhow::Error) -> Value {
        error!("Workflow error for verification {}: {:#}", verification_id, e);
        let reason = format!("Workflow error: {}", e);
        if let Err(update_error) = self
            .deps
            .store
            .update_verification_status(
                verification_id,
                VerificationStatus::Failed,
                Some(VerificationOutcome::Failed),
                Some(&reason),
            )
            .await
        {
            error!(
                "Failed to record workflow crash for {}: {:#}",
                verification_id, update_error
            );
        }
        json!({ "status": "failed", "error": e.to_string() })
    }
}

/// Create a verification row, persist any additional data, and enqueue the
/// matching job. Used by the HTTP façade for both submission endpoints.
pub struct VerificationSubmitter {
    deps: Arc<EngineDeps>,
    queue: Arc<dyn JobDispatcher>,
}

impl VerificationSubmitter {
    pub fn new(deps: Arc<EngineDeps>, queue: Arc<dyn JobDispatcher>) -> Self {
        Self { deps, queue }
    }

    /// Submit an individual verification; returns the verification id
    pub async fn submit_individual(
        &self,
        user_id: &str,
        additional_data: Option<Value>,
    ) -> Result<String> {
        let verification_id = Uuid::new_v4().to_string();
        self.deps
            .store
            .create_verification(
                &verification_id,
                Some(user_id),
                None,
                VerificationStatus::Queued,
            )
            .await?;

        if let Some(additional) = &additional_data {
            self.deps
                .store
                .store_input(&verification_id, "additional_data", additional.clone())
                .await?;
        }

        let job_id = self
            .queue
            .dispatch(
                JobFunction::IndividualVerification,
                &json!({
                    "verification_id": &verification_id,
                    "user_id": user_id,
                    "additional_data": additional_data,
                }),
            )
            .await
            .context("Failed to enqueue individual verification")?;

        info!(
            "Enqueued individual verification {} as job {}",
            verification_id, job_id
        );
        Ok(verification_id)
    }

    /// Submit a business verification; returns the verification id
    pub async fn submit_business(
        &self,
        business_id: &str,
        additional_data: Option<Value>,
    ) -> Result<String> {
        let verification_id = Uuid::new_v4().to_string();
        self.deps
            .store
            .create_verification(
                &verification_id,
                None,
                Some(business_id),
                VerificationStatus::Queued,
            )
            .await?;

        if let Some(additional) = &additional_data {
            self.deps
                .store
                .store_input(&verification_id, "additional_data", additional.clone())
                .await?;
        }

        let job_id = self
            .queue
            .dispatch(
                JobFunction::BusinessVerification,
                &json!({
                    "verification_id": &verification_id,
                    "business_id": business_id,
                    "additional_data": additional_data,
                }),
            )
            .await
            .context("Failed to enqueue business verification")?;

        info!(
            "Enqueued business verification {} as job {}",
            verification_id, job_id
        );
        Ok(verification_id)
    }
}
