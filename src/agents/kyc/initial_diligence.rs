//! Initial diligence checks

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::agents::helpers::{check_status, find_included, summary_or, user_sections};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

/// Identity, watchlist, and geography checks from the provider inquiry
pub struct InitialDiligenceAgent;

#[async_trait]
impl Agent for InitialDiligenceAgent {
    fn agent_type(&self) -> &'static str {
        "InitialDiligenceAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (user_data, persona_data, _) = user_sections(&inputs);

        let watchlist = find_included(&persona_data, "verification/watchlist");

        let mut checks = Vec::new();

        let identity_verified = user_data["identity_verified"].as_bool().unwrap_or(false);
        checks.push(Check::new(
            "Identity Verification",
            if identity_verified {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            if identity_verified {
                "Identity verified in database"
            } else {
                "Identity not verified"
            },
        ));

        let pep_status = check_status(watchlist, "watchlist_pep_detection");
        checks.push(Check::new(
            "Watchlist (PEP)",
            CheckStatus::from_provider(&pep_status),
            format!("PEP check result: {}", pep_status),
        ));

        let ofac_status = check_status(watchlist, "watchlist_ofac_detection");
        checks.push(Check::new(
            "Watchlist (OFAC)",
            CheckStatus::from_provider(&ofac_status),
            format!("OFAC check result: {}", ofac_status),
        ));

        let geo = find_included(&persona_data, "verification/geolocation");
        let geo_status = geo
            .and_then(|g| g["status"].as_str())
            .unwrap_or("not_applicable");
        checks.push(Check::new(
            "Banned Geographies",
            CheckStatus::from_provider(geo_status),
            format!("Geography check result: {}", geo_status),
        ));

        let analysis = ctx
            .analyze_with_llm(
                &json!({ "checks": &checks }),
                "Analyze the following identity verification checks and determine the overall risk level.\n\
                 Consider each check's status and provide a brief explanation of your assessment.\n\
                 Your response should include:\n\
                 1. An overall risk level: 'low', 'medium', or 'high'\n\
                 2. A summary explanation of why you assigned this risk level\n\
                 3. Any recommendations for additional verification steps if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Initial diligence checks completed"),
            checks,
        ))
    }
}
