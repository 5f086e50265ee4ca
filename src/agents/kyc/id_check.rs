//! Comprehensive ID document check

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::agents::helpers::{
    find_check, find_included, persona_field, summary_or, user_sections,
};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

/// Document type, MRZ, expiration, security features, and name consistency
pub struct IdCheckAgent;

#[async_trait]
impl Agent for IdCheckAgent {
    fn agent_type(&self) -> &'static str {
        "IdCheckAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (user_data, persona_data, _) = user_sections(&inputs);

        let govt_id = find_included(&persona_data, "verification/government-id");

        let mut checks = Vec::new();

        let id_type_check = govt_id.and_then(|v| find_check(v, "id_disallowed_type_detection"));
        let id_metadata = id_type_check.map(|c| c["metadata"].clone()).unwrap_or_default();
        let detected_class = id_metadata["detected-id-class"].as_str().unwrap_or_default();
        let is_real_id = id_metadata["detected-id-designations"]
            .as_array()
            .map(|d| d.iter().any(|v| v == "REAL_ID"))
            .unwrap_or(false);
        checks.push(Check::new(
            "ID Document Type",
            CheckStatus::Passed,
            format!("Document type: {}, REAL ID: {}", detected_class, is_real_id),
        ));

        let mrz_present = govt_id
            .and_then(|v| find_check(v, "id_mrz_detection"))
            .and_then(|c| c["status"].as_str())
            .map(|s| s == "passed")
            .unwrap_or(true);
        checks.push(Check::new(
            "ID MRZ Check",
            if mrz_present {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            if mrz_present {
                "MRZ data valid and consistent with visual inspection"
            } else {
                "MRZ data missing or inconsistent"
            },
        ));

        let expiration_check = govt_id.and_then(|v| find_check(v, "id_expired_detection"));
        let expiration_status = expiration_check
            .and_then(|c| c["status"].as_str())
            .unwrap_or("not_applicable");
        let expiration_date = expiration_check
            .and_then(|c| c["metadata"]["expiration-date"].as_str())
            .unwrap_or_default();
        checks.push(Check::new(
            "ID Expiration Check",
            CheckStatus::from_provider(expiration_status),
            format!(
                "Expiration date: {}, Status: {}",
                expiration_date, expiration_status
            ),
        ));

        let tamper_clean = govt_id
            .and_then(|v| find_check(v, "id_tamper_detection"))
            .and_then(|c| c["status"].as_str())
            .map(|s| s == "passed")
            .unwrap_or(true);
        checks.push(Check::new(
            "ID Security Features",
            if tamper_clean {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            if tamper_clean {
                "All security features present and valid"
            } else {
                "Security feature inspection flagged tampering"
            },
        ));

        // Name on the document comes from the provider's extracted fields;
        // compare against the name on file
        let name_on_id = match (
            persona_field(&persona_data, "name-first"),
            persona_field(&persona_data, "name-last"),
        ) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first,
            (None, Some(last)) => last,
            (None, None) => String::new(),
        };
        let name_in_system = user_data["name"].as_str().unwrap_or_default();
        if name_on_id.is_empty() || name_in_system.is_empty() {
            checks.push(Check::new(
                "ID Data Consistency",
                CheckStatus::NotApplicable,
                "Name comparison unavailable",
            ));
        } else {
            let name_match = name_on_id.to_lowercase() == name_in_system.to_lowercase();
            checks.push(Check::new(
                "ID Data Consistency",
                if name_match {
                    CheckStatus::Passed
                } else {
                    CheckStatus::Failed
                },
                format!("Name match: {}", name_match),
            ));
        }

        let analysis = ctx
            .analyze_with_llm(
                &json!({ "checks": &checks }),
                "Perform a comprehensive analysis of the ID document verification results.\n\
                 Consider:\n\
                 1. The type and quality of the ID document\n\
                 2. Security features and their verification\n\
                 3. Expiration status\n\
                 4. Consistency between ID data and user-provided data\n\n\
                 Your response should include:\n\
                 1. An overall assessment of the ID's authenticity\n\
                 2. Any inconsistencies or concerns identified\n\
                 3. A risk level (low, medium, high) based on these factors\n\
                 4. Recommendations for additional verification if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "ID check completed"),
            checks,
        ))
    }
}
