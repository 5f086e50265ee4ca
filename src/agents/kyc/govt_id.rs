//! Government ID document checks

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::agents::helpers::{find_check, find_included, summary_or, user_sections};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

/// The fixed set of provider ID checks this agent reports on; a missing
/// provider result surfaces as `not_applicable`
const REQUIRED_CHECKS: &[(&str, &str)] = &[
    ("Barcode Match", "id_barcode_detection"),
    ("Barcode Inconsistency", "id_barcode_inconsistency_detection"),
    ("Compromised submission", "id_compromised_detection"),
    ("Allowed country", "id_disallowed_country_detection"),
    ("Allowed ID type", "id_disallowed_type_detection"),
    ("Electronic replica", "id_electronic_replica_detection"),
    ("Expiration", "id_expired_detection"),
    ("Fabrication", "id_fabrication_detection"),
    ("Inconsistent repeat", "id_inconsistent_repeat_detection"),
    ("Po Box", "id_po_box_detection"),
    ("Portrait clarity", "id_portrait_clarity_detection"),
    ("Portrait", "id_portrait_detection"),
    ("Selfie-to ID comparison", "id_selfie_comparison"),
    ("ID image tampering", "id_tamper_detection"),
];

/// One check per provider government-ID detection
pub struct GovtIdVerificationAgent;

#[async_trait]
impl Agent for GovtIdVerificationAgent {
    fn agent_type(&self) -> &'static str {
        "GovtIdVerificationAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (_, persona_data, _) = user_sections(&inputs);

        let govt_id = find_included(&persona_data, "verification/government-id");

        let mut checks = Vec::new();
        for (name, provider_name) in REQUIRED_CHECKS {
            let provider_check = govt_id.and_then(|v| find_check(v, provider_name));
            let status = provider_check
                .and_then(|c| c["status"].as_str())
                .unwrap_or("not_applicable");
            let metadata = provider_check
                .map(|c| c["metadata"].clone())
                .filter(|m| !m.is_null());

            let mut check = Check::new(
                *name,
                CheckStatus::from_provider(status),
                format!("{} check result: {}", name, status),
            );
            if let Some(metadata) = metadata {
                check = check.with_metadata(metadata);
            }
            checks.push(check);
        }

        let analysis = ctx
            .analyze_with_llm(
                &json!({ "checks": &checks }),
                "Analyze the following government ID verification checks for suspicious patterns.\n\
                 Identify any anomalies or concerning results, even if individual checks passed.\n\
                 Your response should include:\n\
                 1. An assessment of ID authenticity based on these checks\n\
                 2. Any suspicious patterns or potential fraud indicators\n\
                 3. A confidence level in the ID verification\n\
                 4. Recommendations for additional verification steps if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Government ID verification completed"),
            checks,
        ))
    }
}
