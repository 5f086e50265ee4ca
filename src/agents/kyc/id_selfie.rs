//! Selfie-to-ID comparison

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::agents::helpers::{find_check, find_included, summary_or, user_sections};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

/// Minimum provider confidence for the selfie match to pass
const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Selfie match with a confidence floor on top of the provider verdict
pub struct IdSelfieVerificationAgent;

#[async_trait]
impl Agent for IdSelfieVerificationAgent {
    fn agent_type(&self) -> &'static str {
        "IdSelfieVerificationAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (_, persona_data, _) = user_sections(&inputs);

        let govt_id = find_included(&persona_data, "verification/government-id");
        let selfie_check = govt_id.and_then(|v| find_check(v, "id_selfie_comparison"));

        let selfie_status = selfie_check
            .and_then(|c| c["status"].as_str())
            .unwrap_or("not_applicable");
        let confidence_score = selfie_check
            .and_then(|c| c["metadata"]["confidence-score"].as_f64())
            .unwrap_or(0.0);

        let passed = selfie_status == "passed" && confidence_score >= CONFIDENCE_THRESHOLD;
        let status = if passed {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        };

        let mut checks = Vec::new();
        checks.push(
            Check::new(
                "ID to Selfie Comparison",
                status,
                format!(
                    "ID to selfie comparison: {}, confidence score: {}",
                    status.as_str(),
                    confidence_score
                ),
            )
            .with_metadata(json!({ "confidence_score": confidence_score })),
        );

        checks.push(Check::new(
            "Facial Anomalies",
            status,
            if passed {
                "No anomalies detected"
            } else {
                "Anomalies detected"
            },
        ));

        let analysis = ctx
            .analyze_with_llm(
                &json!({ "checks": &checks }),
                "Analyze the ID selfie verification results and determine if there are any\n\
                 risks or concerns. Consider the confidence score and whether any facial\n\
                 anomalies were detected. Your response should include:\n\
                 1. An overall assessment of the ID-to-selfie match\n\
                 2. Any potential signs of presentation attacks (e.g., using a photo of a photo)\n\
                 3. A confidence rating in your assessment (low, medium, high)\n\
                 4. Recommendations for additional verification if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "ID selfie verification completed"),
            checks,
        ))
    }
}
