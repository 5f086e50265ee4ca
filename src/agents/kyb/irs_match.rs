//! Tax-ID verification against IRS records

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::agents::helpers::{business_sections, str_at, summary_or};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

use super::{business_profile, is_valid_tax_id};

/// Tax-ID format, database match, name match, and standing checks
pub struct IrsMatchAgent;

#[async_trait]
impl Agent for IrsMatchAgent {
    fn agent_type(&self) -> &'static str {
        "IrsMatchAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (business_data, persona_data, business_details) = business_sections(&inputs);
        let profile = business_profile(&business_data, &persona_data, &business_details);

        let mut checks = Vec::new();

        let tax_id_valid = is_valid_tax_id(&profile.tax_id);
        checks.push(Check::new(
            "Tax ID Format Validation",
            if tax_id_valid {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!(
                "Tax ID format is {}: {}",
                if tax_id_valid { "valid" } else { "invalid" },
                profile.tax_id
            ),
        ));

        let tax_id_verified = business_data["tax_id_verified"].as_bool().unwrap_or(false);
        checks.push(Check::new(
            "IRS Database Match",
            if tax_id_verified {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!("Tax ID verified with IRS database: {}", tax_id_verified),
        ));

        let ein_owner_name = str_at(&business_data, "/ein_owner_name").unwrap_or_default();
        let name_match = !profile.name.is_empty()
            && profile.name.to_lowercase() == ein_owner_name.to_lowercase();
        checks.push(Check::new(
            "Business Name Match",
            if name_match {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!(
                "Business name match: {}, Submitted: {}, IRS: {}",
                name_match, profile.name, ein_owner_name
            ),
        ));

        let good_standing = business_data["good_standing"].as_bool().unwrap_or(false);
        checks.push(Check::new(
            "Tax Filing Status",
            if good_standing {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!("Business in good standing with IRS: {}", good_standing),
        ));

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "checks": &checks,
                    "business_data": business_data,
                }),
                "Analyze the IRS verification results and determine if there are any\n\
                 tax compliance concerns. Consider:\n\
                 1. Tax ID validation\n\
                 2. IRS database matching\n\
                 3. Business name consistency\n\
                 4. Tax filing status\n\n\
                 Your response should include:\n\
                 1. An overall assessment of tax compliance\n\
                 2. Any specific compliance concerns or inconsistencies\n\
                 3. Recommendations for additional tax verification if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "IRS verification completed"),
            checks,
        ))
    }
}
