//! Normal diligence checks for a business

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::agents::helpers::{business_sections, str_at, summary_or};
use crate::agents::{Agent, AgentContext};
use crate::integrations::RegistryProvider;
use crate::store::{AgentReport, Check, CheckStatus};

use super::business_profile;

/// Business types that fail outright
const BANNED_BUSINESS_TYPES: &[&str] = &[
    "gambling",
    "cryptocurrency_exchange",
    "adult_content",
    "weapons",
];

/// Industries that fail outright
const BANNED_INDUSTRIES: &[&str] = &[
    "gambling",
    "adult_entertainment",
    "weapons_manufacturing",
    "cryptocurrency",
];

/// Countries where a business subject fails the geography check
const BANNED_COUNTRIES: &[&str] = &["North Korea", "Iran", "Syria", "Cuba"];

/// Type, industry, UBO, and geography checks with registry cross-validation
pub struct NormalDiligenceAgent;

#[async_trait]
impl Agent for NormalDiligenceAgent {
    fn agent_type(&self) -> &'static str {
        "NormalDiligenceAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (business_data, persona_data, business_details) = business_sections(&inputs);
        let profile = business_profile(&business_data, &persona_data, &business_details);

        let registry_record = match ctx
            .deps
            .registry
            .lookup(&profile.name, &profile.registration_country)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                warn!("Registry lookup failed for '{}': {}", profile.name, e);
                Value::Null
            }
        };

        let mut checks = Vec::new();

        let business_type = profile.business_type.to_lowercase();
        let type_banned = BANNED_BUSINESS_TYPES.contains(&business_type.as_str());
        let registry_type = str_at(&registry_record, "/business_type").unwrap_or_default();
        let type_matches = !registry_type.is_empty()
            && business_type == registry_type.to_lowercase();
        checks.push(Check::new(
            "Business Type",
            if type_banned {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Business type: {}, {}, Match with external data: {}",
                profile.business_type,
                if type_banned { "Banned type" } else { "Allowed type" },
                type_matches
            ),
        ));

        let industry = profile.industry.to_lowercase();
        let industry_banned = BANNED_INDUSTRIES.contains(&industry.as_str());
        let registry_industry = str_at(&registry_record, "/industry").unwrap_or_default();
        let industry_matches =
            !registry_industry.is_empty() && industry == registry_industry.to_lowercase();
        checks.push(Check::new(
            "Industry Type",
            if industry_banned {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Industry type: {}, {}, Match with external data: {}",
                profile.industry,
                if industry_banned {
                    "Banned industry"
                } else {
                    "Allowed industry"
                },
                industry_matches
            ),
        ));

        let ein_owner_name = str_at(&business_data, "/ein_owner_name").unwrap_or_default();
        let ubo_match = !profile.ubo_name.is_empty()
            && profile.ubo_name.to_lowercase() == ein_owner_name.to_lowercase();
        checks.push(Check::new(
            "KYC/UBO Information",
            if ubo_match {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!(
                "UBO name: {}, EIN owner name: {}, Match: {}",
                profile.ubo_name, ein_owner_name, ubo_match
            ),
        ));

        let country_banned = BANNED_COUNTRIES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&profile.country));
        checks.push(Check::new(
            "Banned Geographics",
            if country_banned {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Business country: {}, {}",
                profile.country,
                if country_banned {
                    "Banned country"
                } else {
                    "Allowed country"
                }
            ),
        ));

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "business_data": business_data,
                    "registry_record": registry_record,
                    "checks": &checks,
                }),
                "Analyze the following business verification checks and determine if there are any inconsistencies\n\
                 or red flags between the provided business data and external sources.\n\
                 Your response should include:\n\
                 1. An overall assessment of business legitimacy\n\
                 2. Any inconsistencies or discrepancies between data sources\n\
                 3. Potential risk factors identified\n\
                 4. Recommendations for additional verification if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Normal diligence checks completed"),
            checks,
        ))
    }
}
