//! Result compilation
//!
//! The last agent of each workflow. Folds every prior agent result (and,
//! for a business, the terminal state of each UBO child) into one decision
//! through the LLM compilation prompt. Error rows are legitimate compiler
//! inputs; the decision is derived from whatever results exist when
//! compilation runs. The workflow, not this agent, writes the terminal
//! verification row from the returned report.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::store::{AgentReport, VerificationStore};

use super::{Agent, AgentContext};

pub const COMPILATION_AGENT_TYPE: &str = "ResultCompilationAgent";
pub const BUSINESS_COMPILATION_AGENT_TYPE: &str = "BusinessResultCompilationAgent";

const COMPILATION_PROMPT: &str = r#"You are a verification expert. Analyze the results from all verification agents and determine:
1. The overall verification result (passed/failed)
2. A detailed explanation of your reasoning
3. Key risk factors identified
4. Confidence level in your determination

Respond with a JSON object containing these fields:
- verification_result: "passed" or "failed"
- reasoning: detailed explanation
- risk_factors: array of identified risk factors
- confidence: "low", "medium", or "high"
- summary: brief overall assessment"#;

const BUSINESS_COMPILATION_PROMPT: &str = r#"You are a business verification expert. Analyze the results from all business verification agents and UBO verifications to determine:
1. The overall business verification result (passed/failed)
2. A detailed explanation of your reasoning
3. Key risk factors identified
4. Confidence level in your determination

Important considerations:
- If any UBO verification failed, consider this in your assessment
- Weight business structure and ownership verification heavily
- Consider industry and geographic risk factors

Respond with a JSON object containing these fields:
- verification_result: "passed" or "failed"
- reasoning: detailed explanation
- risk_factors: array of identified risk factors
- confidence: "low", "medium", or "high"
- summary: brief overall assessment"#;

fn results_as_json(rows: &[crate::store::AgentResultRow]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            json!({
                "agent_type": &row.report.agent_type,
                "status": row.report.status,
                "details": &row.report.details,
                "checks": &row.report.checks,
            })
        })
        .collect()
}

fn decision_report(agent_type: &'static str, details: &str, analysis: Value) -> AgentReport {
    let verification_result = analysis["verification_result"]
        .as_str()
        .unwrap_or("failed")
        .to_string();
    let reasoning = analysis["reasoning"]
        .as_str()
        .unwrap_or("Insufficient data to complete verification")
        .to_string();

    AgentReport::success(agent_type, details, Vec::new())
        .with_extra("verification_result", json!(verification_result))
        .with_extra("reasoning", json!(reasoning))
        .with_extra(
            "risk_factors",
            analysis
                .get("risk_factors")
                .cloned()
                .unwrap_or_else(|| json!([])),
        )
        .with_extra(
            "confidence",
            analysis.get("confidence").cloned().unwrap_or(json!("medium")),
        )
        .with_extra(
            "summary",
            analysis.get("summary").cloned().unwrap_or(Value::Null),
        )
}

/// Compiles the individual-workflow decision
pub struct ResultCompilationAgent;

#[async_trait]
impl Agent for ResultCompilationAgent {
    fn agent_type(&self) -> &'static str {
        COMPILATION_AGENT_TYPE
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let rows = ctx.deps.store.get_agent_results(&ctx.verification_id).await?;
        let agent_results = results_as_json(&rows);

        let error_count = rows
            .iter()
            .filter(|r| r.report.status == crate::store::AgentStatus::Error)
            .count();
        info!(
            "Compiling {} agent results ({} errored) for verification {}",
            rows.len(),
            error_count,
            ctx.verification_id
        );

        let analysis = ctx
            .analyze_with_llm(&json!({ "agent_results": agent_results }), COMPILATION_PROMPT)
            .await?;

        Ok(decision_report(
            COMPILATION_AGENT_TYPE,
            "Successfully compiled verification results",
            analysis,
        ))
    }
}

/// Compiles the business-workflow decision, UBO outcomes included
pub struct BusinessResultCompilationAgent;

#[async_trait]
impl Agent for BusinessResultCompilationAgent {
    fn agent_type(&self) -> &'static str {
        BUSINESS_COMPILATION_AGENT_TYPE
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let rows = ctx.deps.store.get_agent_results(&ctx.verification_id).await?;
        let business_agent_results = results_as_json(&rows);

        // The join deadline may have passed with children still running;
        // their last-known status is what the compiler sees
        let mut ubo_results = Vec::new();
        for ubo_verification_id in &ctx.ubo_verification_ids {
            let verification = ctx.deps.store.get_verification(ubo_verification_id).await?;
            let ubo_rows = ctx.deps.store.get_agent_results(ubo_verification_id).await?;
            let final_row = ubo_rows
                .iter()
                .rev()
                .find(|row| row.report.agent_type == COMPILATION_AGENT_TYPE);

            ubo_results.push(json!({
                "verification_id": ubo_verification_id,
                "status": verification
                    .map(|v| v.status.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                "result": final_row
                    .and_then(|row| row.report.extras.get("verification_result"))
                    .cloned()
                    .unwrap_or(Value::Null),
                "reasoning": final_row
                    .and_then(|row| row.report.extras.get("reasoning"))
                    .cloned()
                    .unwrap_or(Value::Null),
            }));
        }

        let failed_ubo_count = ubo_results
            .iter()
            .filter(|r| r["result"] == "failed")
            .count();

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "business_agent_results": business_agent_results,
                    "ubo_results": &ubo_results,
                    "failed_ubo_verifications": failed_ubo_count,
                }),
                BUSINESS_COMPILATION_PROMPT,
            )
            .await?;

        Ok(decision_report(
            BUSINESS_COMPILATION_AGENT_TYPE,
            "Successfully compiled business verification results",
            analysis,
        )
        .with_extra("ubo_results", json!(ubo_results)))
    }
}
