//! Business-subject verification agents

use serde_json::Value;

use crate::agents::helpers::{persona_field, str_at};

pub mod articles_incorporation;
pub mod ein_letter;
pub mod irs_match;
pub mod normal_diligence;
pub mod sos_filings;

pub use articles_incorporation::ArticlesIncorporationAgent;
pub use ein_letter::EinLetterAgent;
pub use irs_match::IrsMatchAgent;
pub use normal_diligence::NormalDiligenceAgent;
pub use sos_filings::SosFilingsAgent;

/// Business identity extracted from the persisted inputs with the standard
/// precedence: structured business details first, raw provider inquiry
/// fields second, operational business record last
#[derive(Debug, Clone, Default)]
pub(crate) struct BusinessProfile {
    pub name: String,
    pub business_type: String,
    pub industry: String,
    pub tax_id: String,
    pub registration_number: String,
    pub registration_state: String,
    pub registration_country: String,
    pub incorporation_date: String,
    pub legal_structure: String,
    pub ubo_name: String,
    pub country: String,
    pub state: String,
}

pub(crate) fn business_profile(
    business_data: &Value,
    persona_data: &Value,
    business_details: &Value,
) -> BusinessProfile {
    let mut profile = BusinessProfile::default();

    // Structured details extracted from the provider inquiry
    let info = &business_details["business_info"];
    profile.name = str_at(info, "/business_name").unwrap_or_default();
    profile.business_type = str_at(info, "/entity_type").unwrap_or_default();
    profile.industry = str_at(info, "/business_industry").unwrap_or_default();
    profile.tax_id = str_at(info, "/business_tax_id").unwrap_or_default();
    profile.incorporation_date = str_at(info, "/business_formation_date").unwrap_or_default();
    profile.registration_number =
        str_at(business_details, "/classification_details/registration_number")
            .unwrap_or_default();
    profile.state = str_at(info, "/address/state").unwrap_or_default();
    profile.country = str_at(info, "/address/country_code").unwrap_or_default();

    if let Some(first_ubo) = business_details["beneficial_owners"]
        .as_array()
        .and_then(|owners| owners.first())
    {
        let first = str_at(first_ubo, "/name_first").unwrap_or_default();
        let last = str_at(first_ubo, "/name_last").unwrap_or_default();
        profile.ubo_name = format!("{} {}", first, last).trim().to_string();
    }

    // Raw inquiry fields fill whatever the structured details missed
    if profile.name.is_empty() {
        profile.name = persona_field(persona_data, "business-name").unwrap_or_default();
    }
    if profile.business_type.is_empty() {
        profile.business_type = persona_field(persona_data, "entity-type").unwrap_or_default();
    }
    if profile.industry.is_empty() {
        profile.industry = persona_field(persona_data, "business-industry").unwrap_or_default();
    }
    if profile.tax_id.is_empty() {
        profile.tax_id =
            persona_field(persona_data, "business-tax-identification-number").unwrap_or_default();
    }
    if profile.registration_number.is_empty() {
        profile.registration_number =
            persona_field(persona_data, "business-registration-number").unwrap_or_default();
    }
    if profile.incorporation_date.is_empty() {
        profile.incorporation_date =
            persona_field(persona_data, "business-formation-date").unwrap_or_default();
    }
    if profile.state.is_empty() {
        profile.state = persona_field(persona_data, "business-physical-address-subdivision")
            .unwrap_or_default();
    }
    if profile.country.is_empty() {
        profile.country = persona_field(persona_data, "business-physical-address-country-code")
            .unwrap_or_default();
    }
    if profile.ubo_name.is_empty() {
        let first = persona_field(persona_data, "ubo-1-name-first").unwrap_or_default();
        let last = persona_field(persona_data, "ubo-1-name-last").unwrap_or_default();
        profile.ubo_name = format!("{} {}", first, last).trim().to_string();
    }

    // Operational record as the last resort
    if profile.name.is_empty() {
        profile.name = str_at(business_data, "/business_name").unwrap_or_default();
    }
    if profile.business_type.is_empty() {
        profile.business_type = str_at(business_data, "/business_type").unwrap_or_default();
    }
    if profile.industry.is_empty() {
        profile.industry = str_at(business_data, "/industry_type").unwrap_or_default();
    }
    if profile.tax_id.is_empty() {
        profile.tax_id = str_at(business_data, "/tax_id").unwrap_or_default();
    }
    if profile.registration_number.is_empty() {
        profile.registration_number =
            str_at(business_data, "/registration_number").unwrap_or_default();
    }
    if profile.incorporation_date.is_empty() {
        profile.incorporation_date =
            str_at(business_data, "/incorporation_date").unwrap_or_default();
    }
    if profile.state.is_empty() {
        profile.state = str_at(business_data, "/address/state").unwrap_or_default();
    }
    if profile.country.is_empty() {
        profile.country = str_at(business_data, "/address/country").unwrap_or_default();
    }
    if profile.ubo_name.is_empty() {
        profile.ubo_name = str_at(business_data, "/ubo_name").unwrap_or_default();
    }

    profile.legal_structure = str_at(business_data, "/legal_structure").unwrap_or_default();
    profile.registration_state = profile.state.clone();
    profile.registration_country = profile.country.clone();

    profile
}

/// EIN format: nine digits, with or without the XX-XXXXXXX dash
pub(crate) fn is_valid_tax_id(tax_id: &str) -> bool {
    let digits: String = tax_id.chars().filter(|c| *c != '-').collect();
    digits.len() == 9 && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tax_id_format() {
        assert!(is_valid_tax_id("12-3456789"));
        assert!(is_valid_tax_id("123456789"));
        assert!(!is_valid_tax_id("12-345678"));
        assert!(!is_valid_tax_id("12-345678a"));
    }

    #[test]
    fn profile_precedence_details_first() {
        let business_data = json!({"business_name": "Record Name", "legal_structure": "LLC"});
        let persona_data = json!({
            "data": {"attributes": {"fields": {
                "business-name": {"value": "Inquiry Name"},
                "entity-type": {"value": "LLC"}
            }}}
        });
        let business_details = json!({
            "business_info": {"business_name": "Detail Name"},
            "beneficial_owners": [{"name_first": "Jane", "name_last": "Smith"}]
        });

        let profile = business_profile(&business_data, &persona_data, &business_details);
        assert_eq!(profile.name, "Detail Name");
        assert_eq!(profile.business_type, "LLC");
        assert_eq!(profile.ubo_name, "Jane Smith");
        assert_eq!(profile.legal_structure, "LLC");
    }

    #[test]
    fn profile_falls_back_to_operational_record() {
        let business_data = json!({
            "business_name": "Record Name",
            "tax_id": "12-3456789",
            "address": {"state": "CA", "country": "US"}
        });
        let profile = business_profile(&business_data, &json!({}), &json!({}));
        assert_eq!(profile.name, "Record Name");
        assert_eq!(profile.tax_id, "12-3456789");
        assert_eq!(profile.state, "CA");
    }
}
