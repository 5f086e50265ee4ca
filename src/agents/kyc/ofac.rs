//! Sanctions-list verification

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::agents::helpers::{
    check_status, find_included, persona_field, str_at, summary_or, user_sections,
};
use crate::agents::{Agent, AgentContext};
use crate::integrations::{SanctionsProvider, SanctionsQuery};
use crate::store::{AgentReport, Check, CheckStatus};

/// Countries whose subjects fail the country sanctions check, by name and
/// ISO code
const SANCTIONED_COUNTRIES: &[&str] = &[
    "NORTH KOREA",
    "IRAN",
    "SYRIA",
    "CUBA",
    "RUSSIA",
    "BELARUS",
    "KP",
    "IR",
    "SY",
    "CU",
    "RU",
    "BY",
];

/// Sources whose matches are treated as high risk
const HIGH_RISK_SOURCES: &[&str] = &["sdn", "ofac", "specially designated nationals"];

/// Sanctions search plus provider-watchlist fallback and country screening
pub struct OfacVerificationAgent;

impl OfacVerificationAgent {
    /// Subject name and address with the documented precedence: persisted
    /// subject data first, provider inquiry fields second, empty fallback
    fn extract_subject(user_data: &Value, persona_data: &Value) -> SanctionsQuery {
        let mut query = SanctionsQuery::default();

        query.name = str_at(user_data, "/name")
            .or_else(|| str_at(user_data, "/full_name"))
            .or_else(|| {
                let first = str_at(user_data, "/first_name").unwrap_or_default();
                let last = str_at(user_data, "/last_name").unwrap_or_default();
                let combined = format!("{} {}", first, last).trim().to_string();
                (!combined.is_empty()).then_some(combined)
            })
            .unwrap_or_default();

        query.address = str_at(user_data, "/address/street")
            .or_else(|| str_at(user_data, "/address/line1"))
            .unwrap_or_default();
        query.city = str_at(user_data, "/address/city").unwrap_or_default();
        query.state = str_at(user_data, "/address/state")
            .or_else(|| str_at(user_data, "/address/subdivision"))
            .unwrap_or_default();
        query.zip = str_at(user_data, "/address/postal_code")
            .or_else(|| str_at(user_data, "/address/zip"))
            .unwrap_or_default();
        query.country = str_at(user_data, "/address/country")
            .or_else(|| str_at(user_data, "/address/country_code"))
            .unwrap_or_default();

        if query.name.is_empty() {
            let first = persona_field(persona_data, "name-first").unwrap_or_default();
            let last = persona_field(persona_data, "name-last").unwrap_or_default();
            query.name = format!("{} {}", first, last).trim().to_string();
        }
        if query.address.is_empty() {
            query.address = persona_field(persona_data, "address-street-1").unwrap_or_default();
        }
        if query.city.is_empty() {
            query.city = persona_field(persona_data, "address-city").unwrap_or_default();
        }
        if query.state.is_empty() {
            query.state = persona_field(persona_data, "address-subdivision").unwrap_or_default();
        }
        if query.zip.is_empty() {
            query.zip = persona_field(persona_data, "address-postal-code").unwrap_or_default();
        }
        if query.country.is_empty() {
            query.country =
                persona_field(persona_data, "address-country-code").unwrap_or_default();
        }

        query
    }

    fn sanctions_checks(analysis: &Value) -> Vec<Check> {
        let mut checks = Vec::new();

        let has_matches = analysis["has_matches"].as_bool().unwrap_or(false);
        let total_matches = analysis["total_matches"].as_u64().unwrap_or(0);
        let risk_level = analysis["risk_level"].as_str().unwrap_or("low");

        checks.push(
            Check::new(
                "OFAC Sanctions List Match",
                if has_matches {
                    CheckStatus::Failed
                } else {
                    CheckStatus::Passed
                },
                format!(
                    "OFAC search found {} potential matches. Risk level: {}",
                    total_matches, risk_level
                ),
            )
            .with_metadata(json!({
                "total_matches": total_matches,
                "risk_level": risk_level,
                "sources": analysis["sources"].clone(),
            })),
        );

        if has_matches {
            let match_details = analysis["match_details"]
                .as_array()
                .cloned()
                .unwrap_or_default();

            let high_risk: Vec<&Value> = match_details
                .iter()
                .filter(|m| {
                    m["source"]
                        .as_str()
                        .map(|s| HIGH_RISK_SOURCES.contains(&s.to_lowercase().as_str()))
                        .unwrap_or(false)
                })
                .collect();
            checks.push(
                Check::new(
                    "High Risk OFAC Match",
                    if high_risk.is_empty() {
                        CheckStatus::Passed
                    } else {
                        CheckStatus::Failed
                    },
                    format!("Found {} high-risk OFAC matches", high_risk.len()),
                )
                .with_metadata(json!({
                    "high_risk_matches": high_risk.len(),
                    "match_sources": high_risk
                        .iter()
                        .map(|m| m["source"].clone())
                        .collect::<Vec<_>>(),
                })),
            );

            let entity_types: Vec<&str> = match_details
                .iter()
                .filter_map(|m| m["type"].as_str())
                .collect();
            let person_matches = entity_types.iter().filter(|t| **t == "person").count();
            let business_matches = entity_types
                .iter()
                .filter(|t| **t == "business" || **t == "organization")
                .count();
            checks.push(
                Check::new(
                    "OFAC Entity Type Analysis",
                    if person_matches > 0 {
                        CheckStatus::Warning
                    } else {
                        CheckStatus::Passed
                    },
                    format!(
                        "Person matches: {}, Business matches: {}",
                        person_matches, business_matches
                    ),
                )
                .with_metadata(json!({
                    "person_matches": person_matches,
                    "business_matches": business_matches,
                    "entity_types": entity_types,
                })),
            );
        }

        checks
    }

    fn persona_watchlist_checks(persona_data: &Value) -> Vec<Check> {
        let mut checks = Vec::new();
        let Some(watchlist) = find_included(persona_data, "verification/watchlist") else {
            return checks;
        };

        let ofac_status = check_status(Some(watchlist), "watchlist_ofac_detection");
        checks.push(Check::new(
            "Persona OFAC Check",
            CheckStatus::from_provider(&ofac_status),
            format!("Persona OFAC watchlist check result: {}", ofac_status),
        ));

        let pep_status = check_status(Some(watchlist), "watchlist_pep_detection");
        checks.push(Check::new(
            "Persona PEP Check",
            CheckStatus::from_provider(&pep_status),
            format!("Persona PEP watchlist check result: {}", pep_status),
        ));

        checks
    }

    /// Fail when the subject's country is on the sanctioned list
    pub fn country_sanctions_check(country: &str) -> Check {
        let sanctioned = SANCTIONED_COUNTRIES.contains(&country.trim().to_uppercase().as_str());
        Check::new(
            "Country Sanctions Check",
            if sanctioned {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!("Country: {}, Sanctioned: {}", country, sanctioned),
        )
        .with_metadata(json!({
            "country": country,
            "is_sanctioned": sanctioned,
        }))
    }
}

#[async_trait]
impl Agent for OfacVerificationAgent {
    fn agent_type(&self) -> &'static str {
        "OfacVerificationAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (user_data, persona_data, _) = user_sections(&inputs);

        let query = Self::extract_subject(&user_data, &persona_data);
        info!(
            "Sanctions search subject: name='{}', country='{}'",
            query.name, query.country
        );

        let search_results = if query.name.is_empty() {
            warn!("No name available for sanctions search");
            json!({ "entities": [], "query": query })
        } else {
            match ctx.deps.sanctions.search_entity(&query).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("Sanctions search failed: {}", e);
                    json!({ "entities": [], "query": query, "error": e.to_string() })
                }
            }
        };

        let analysis = ctx.deps.sanctions.analyze(&search_results);

        let mut checks = Self::sanctions_checks(&analysis);
        checks.extend(Self::persona_watchlist_checks(&persona_data));
        checks.push(Self::country_sanctions_check(&query.country));

        let risk_analysis = ctx
            .analyze_with_llm(
                &json!({
                    "checks": &checks,
                    "user_info": &query,
                    "ofac_analysis": &analysis,
                    "search_results": &search_results,
                }),
                "Analyze the OFAC sanctions verification results and determine if there\n\
                 are any compliance concerns. Consider:\n\
                 1. OFAC API search results and any entity matches\n\
                 2. Risk level assessment from the search analysis\n\
                 3. Country-based sanctions\n\
                 4. Watchlist verification results (if available)\n\
                 5. Name similarity and address matching confidence\n\n\
                 Respond with a JSON object containing:\n\
                 - risk_level: \"low\", \"medium\", or \"high\"\n\
                 - summary: Brief overall assessment\n\
                 - concerns: List of specific concerns\n\
                 - recommendations: List of recommended actions",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&risk_analysis, "OFAC verification completed"),
            checks,
        )
        .with_extra("risk_analysis", risk_analysis)
        .with_extra("ofac_matches", analysis["total_matches"].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CheckStatus;

    #[test]
    fn sanctioned_country_codes_fail() {
        let check = OfacVerificationAgent::country_sanctions_check("KP");
        assert_eq!(check.status, CheckStatus::Failed);
        let check = OfacVerificationAgent::country_sanctions_check("North Korea");
        assert_eq!(check.status, CheckStatus::Failed);
        let check = OfacVerificationAgent::country_sanctions_check("US");
        assert_eq!(check.status, CheckStatus::Passed);
    }

    #[test]
    fn subject_extraction_prefers_persisted_data() {
        let user_data = json!({
            "name": "Jane Doe",
            "address": {"street": "1 Main St", "city": "Springfield", "country": "US"}
        });
        let persona_data = json!({
            "data": {"attributes": {"fields": {
                "name-first": {"value": "Other"},
                "name-last": {"value": "Person"}
            }}}
        });
        let query = OfacVerificationAgent::extract_subject(&user_data, &persona_data);
        assert_eq!(query.name, "Jane Doe");
        assert_eq!(query.city, "Springfield");
    }

    #[test]
    fn subject_extraction_falls_back_to_provider_fields() {
        let user_data = json!({});
        let persona_data = json!({
            "data": {"attributes": {"fields": {
                "name-first": {"value": "Omar"},
                "name-last": {"value": "Haddad"},
                "address-country-code": {"value": "KP"}
            }}}
        });
        let query = OfacVerificationAgent::extract_subject(&user_data, &persona_data);
        assert_eq!(query.name, "Omar Haddad");
        assert_eq!(query.country, "KP");
    }
}
