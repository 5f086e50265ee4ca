//! Secretary of State filings verification

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::json;

use crate::agents::helpers::{business_sections, str_at, summary_or};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

use super::business_profile;

/// Businesses younger than this get a warning
const MIN_BUSINESS_AGE_DAYS: i64 = 180;

/// A filing gap longer than this fails
const MAX_DAYS_SINCE_FILING: i64 = 365;

fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
}

/// Registration, name consistency, age, and filing-recency checks
pub struct SosFilingsAgent;

#[async_trait]
impl Agent for SosFilingsAgent {
    fn agent_type(&self) -> &'static str {
        "SosFilingsAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (business_data, persona_data, business_details) = business_sections(&inputs);
        let profile = business_profile(&business_data, &persona_data, &business_details);

        let today = Utc::now().date_naive();
        let mut checks = Vec::new();

        let sos_filing_status = str_at(&business_data, "/sos_filing_status").unwrap_or_default();
        let registered = sos_filing_status == "active";
        checks.push(Check::new(
            "SoS Registration",
            if registered {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!("SoS filing status: {}", sos_filing_status),
        ));

        // The operational record's name is the registry-of-record name
        let record_name = str_at(&business_data, "/business_name").unwrap_or_default();
        let name_consistent = record_name.is_empty()
            || profile.name.is_empty()
            || record_name.to_lowercase() == profile.name.to_lowercase();
        checks.push(Check::new(
            "Business Name Consistency",
            if name_consistent {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!("Business name consistent with SoS records: {}", profile.name),
        ));

        match parse_day(&profile.incorporation_date) {
            Some(incorporated) => {
                let age_days = (today - incorporated).num_days();
                let new_business = age_days < MIN_BUSINESS_AGE_DAYS;
                checks.push(Check::new(
                    "Business Age",
                    if new_business {
                        CheckStatus::Warning
                    } else {
                        CheckStatus::Passed
                    },
                    format!(
                        "Business age: {} days, Incorporation date: {}",
                        age_days, profile.incorporation_date
                    ),
                ));
            }
            None => {
                checks.push(Check::new(
                    "Business Age",
                    CheckStatus::Failed,
                    "Incorporation date not available",
                ));
            }
        }

        let last_filing_date = str_at(&business_data, "/last_filing_date").unwrap_or_default();
        match parse_day(&last_filing_date) {
            Some(last_filing) => {
                let days_since = (today - last_filing).num_days();
                let recent = days_since < MAX_DAYS_SINCE_FILING;
                checks.push(Check::new(
                    "Recent Filings",
                    if recent {
                        CheckStatus::Passed
                    } else {
                        CheckStatus::Failed
                    },
                    format!(
                        "Days since last filing: {}, Last filing date: {}",
                        days_since, last_filing_date
                    ),
                ));
            }
            None => {
                checks.push(Check::new(
                    "Recent Filings",
                    CheckStatus::Failed,
                    "Last filing date not available",
                ));
            }
        }

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "checks": &checks,
                    "business_data": business_data,
                }),
                "Analyze the Secretary of State filing verification results and determine\n\
                 if there are any compliance or legitimacy concerns. Consider:\n\
                 1. Registration status with Secretary of State\n\
                 2. Business name consistency\n\
                 3. Business age and establishment history\n\
                 4. Compliance with filing requirements\n\n\
                 Your response should include:\n\
                 1. An overall assessment of business legitimacy based on SoS filings\n\
                 2. Any specific compliance concerns or red flags\n\
                 3. Recommendations for additional verification if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Secretary of State filings verification completed"),
            checks,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_datetime_dates() {
        assert!(parse_day("2020-01-15").is_some());
        assert!(parse_day("2020-01-15T10:30:00Z").is_some());
        assert!(parse_day("").is_none());
        assert!(parse_day("junk").is_none());
    }
}
