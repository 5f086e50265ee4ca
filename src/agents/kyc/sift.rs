//! Fraud-score verification

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::agents::helpers::{summary_or, user_sections};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

/// Overall score above this fails
const SCORE_THRESHOLD: f64 = 70.0;

/// Network risk above this fails
const NETWORK_RISK_THRESHOLD: f64 = 60.0;

/// More associated accounts than this fails
const MAX_ASSOCIATED_USERS: usize = 3;

/// Activity types that read as suspicious regardless of status
const SUSPICIOUS_ACTIVITY_TYPES: &[&str] = &["chargeback", "dispute", "refund"];

/// Score, network, and activity checks over the fraud-score snapshot
pub struct SiftVerificationAgent;

#[async_trait]
impl Agent for SiftVerificationAgent {
    fn agent_type(&self) -> &'static str {
        "SiftVerificationAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (_, _, sift_data) = user_sections(&inputs);

        let mut checks = Vec::new();

        let score = sift_data["score"].as_f64().unwrap_or(0.0);
        checks.push(Check::new(
            "Sift Score",
            if score > SCORE_THRESHOLD {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Sift score: {}, {} threshold ({})",
                score,
                if score > SCORE_THRESHOLD {
                    "Above"
                } else {
                    "Below"
                },
                SCORE_THRESHOLD
            ),
        ));

        let network = &sift_data["user"]["network"];
        let network_risk = network["risk_score"].as_f64().unwrap_or(0.0);
        let associated_users = network["associated_users"]
            .as_array()
            .map(Vec::len)
            .unwrap_or(0);
        let network_failed =
            network_risk > NETWORK_RISK_THRESHOLD || associated_users > MAX_ASSOCIATED_USERS;
        checks.push(Check::new(
            "Sift network",
            if network_failed {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Network risk: {}, Associated users: {}",
                network_risk, associated_users
            ),
        ));

        let activities = sift_data["user"]["activities"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let suspicious_count = activities
            .iter()
            .filter(|a| {
                a["status"] == "failed"
                    || a["type"]
                        .as_str()
                        .map(|t| SUSPICIOUS_ACTIVITY_TYPES.contains(&t))
                        .unwrap_or(false)
            })
            .count();
        checks.push(Check::new(
            "Sift Activities",
            if suspicious_count > 0 {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!("Suspicious activities: {} found", suspicious_count),
        ));

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "sift_score": score,
                    "network_data": network,
                    "activities": activities,
                }),
                "Analyze the following fraud detection data and identify any concerning patterns.\n\
                 Look for high-risk indicators in the score, network data, and user activities.\n\
                 Your response should include:\n\
                 1. An overall fraud risk assessment: 'low', 'medium', or 'high'\n\
                 2. Specific suspicious patterns identified, if any\n\
                 3. Recommendations for additional fraud prevention measures if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Sift verification completed"),
            checks,
        ))
    }
}
