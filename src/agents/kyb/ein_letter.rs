//! EIN letter verification over the document pipeline

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::agents::helpers::{business_sections, str_at, summary_or};
use crate::agents::{Agent, AgentContext};
use crate::documents::pipeline::{non_empty_field_count, PipelineDocument};
use crate::documents::DocumentKind;
use crate::store::{AgentReport, Check, CheckStatus};

use super::{business_profile, is_valid_tax_id};

/// EIN in the standard XX-XXXXXXX form
const EIN_PATTERN: &str = r"\b\d{2}-\d{7}\b";

fn ein_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Whether a processed document looks like an EIN letter: classified as one,
/// classified with tax/EIN keywords, or carrying an EIN-shaped number
fn is_ein_candidate(document: &PipelineDocument, ein_regex: &Regex) -> bool {
    let Some(ocr) = &document.ocr else {
        return false;
    };

    if ocr.kind() == DocumentKind::EinLetter {
        return true;
    }

    let doc_type = ocr.classification["document_type"]
        .as_str()
        .unwrap_or_default()
        .to_lowercase();
    let doc_subtype = ocr.classification["document_subtype"]
        .as_str()
        .unwrap_or_default()
        .to_lowercase();
    if [doc_type.as_str(), doc_subtype.as_str()]
        .iter()
        .any(|s| s.contains("ein") || s.contains("tax"))
    {
        return true;
    }

    ein_regex.is_match(&ocr.raw_text)
        || ocr.extracted_data["ein"]
            .as_str()
            .map(|e| ein_regex.is_match(e))
            .unwrap_or(false)
}

/// Per-document vendor checks passed through under a prefixed name
fn vendor_document_checks(documents: &[PipelineDocument]) -> Vec<Check> {
    let mut checks = Vec::new();
    for document in documents {
        for vendor_check in &document.reference.checks {
            let check_name = vendor_check["name"].as_str().unwrap_or("unnamed");
            let vendor_status = vendor_check["status"].as_str().unwrap_or_default();
            let status = if vendor_status == "success" || vendor_status == "passed" {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            };
            checks.push(Check::new(
                format!("Persona: {} - {}", document.reference.name, check_name),
                status,
                format!("Provider document check: {} - {}", check_name, vendor_status),
            ));
        }
    }
    checks
}

/// Finds the EIN letter among the inquiry documents and verifies it against
/// the business record
pub struct EinLetterAgent;

#[async_trait]
impl Agent for EinLetterAgent {
    fn agent_type(&self) -> &'static str {
        "EinLetterAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (business_data, persona_data, business_details) = business_sections(&inputs);
        let profile = business_profile(&business_data, &persona_data, &business_details);

        let ein_regex = Regex::new(EIN_PATTERN)?;

        let inquiry_id = str_at(&business_data, "/persona_inquiry_id");
        let documents = match &inquiry_id {
            Some(id) => ctx.deps.documents.process_inquiry(id).await?,
            None => {
                warn!(
                    "No provider inquiry id on verification {}; no documents to inspect",
                    ctx.verification_id
                );
                Vec::new()
            }
        };

        // Several documents may look like EIN letters; the one with the
        // richest extraction wins
        let letter = documents
            .iter()
            .filter(|d| is_ein_candidate(d, &ein_regex))
            .max_by_key(|d| {
                d.ocr
                    .as_ref()
                    .map(|ocr| non_empty_field_count(&ocr.extracted_data))
                    .unwrap_or(0)
            });

        if let Some(found) = letter {
            info!(
                "EIN letter candidate for verification {}: document {}",
                ctx.verification_id, found.reference.id
            );
        }

        let mut checks = Vec::new();

        checks.push(Check::new(
            "EIN Letter Present",
            if letter.is_some() {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            if letter.is_some() {
                "EIN letter document found and processed"
            } else {
                "No EIN letter document found or could not be processed"
            },
        ));

        let ein_format_valid = is_valid_tax_id(&profile.tax_id);
        checks.push(Check::new(
            "EIN Format Check",
            if ein_format_valid {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!(
                "EIN format valid: {}, EIN: {}",
                ein_format_valid, profile.tax_id
            ),
        ));

        let extracted = letter.and_then(|d| d.ocr.as_ref()).map(|o| &o.extracted_data);

        let extracted_ein = extracted
            .and_then(|e| e["ein"].as_str())
            .unwrap_or_default();
        if extracted_ein.is_empty() {
            checks.push(Check::new(
                "EIN Number Verification",
                if letter.is_some() {
                    CheckStatus::NotApplicable
                } else {
                    CheckStatus::Failed
                },
                "No EIN could be extracted from the letter",
            ));
        } else {
            let ein_matches = !profile.tax_id.is_empty()
                && ein_digits(extracted_ein) == ein_digits(&profile.tax_id);
            checks.push(Check::new(
                "EIN Number Verification",
                if ein_matches {
                    CheckStatus::Passed
                } else {
                    CheckStatus::Failed
                },
                format!(
                    "EIN on letter: {}, Tax ID on record: {}, Match: {}",
                    extracted_ein, profile.tax_id, ein_matches
                ),
            ));
        }

        let letter_name = extracted
            .and_then(|e| e["company_name"].as_str())
            .unwrap_or_default();
        let name_match = !letter_name.is_empty()
            && !profile.name.is_empty()
            && (letter_name.to_lowercase().contains(&profile.name.to_lowercase())
                || profile.name.to_lowercase().contains(&letter_name.to_lowercase()));
        checks.push(Check::new(
            "Business Name Match",
            if name_match {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!(
                "Business name match: {}, Submitted: {}, EIN letter: {}",
                name_match, profile.name, letter_name
            ),
        ));

        let official = extracted
            .and_then(|e| e["is_official_irs_letter"].as_bool())
            .unwrap_or(false);
        checks.push(Check::new(
            "Letter Authenticity",
            if official {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!("Letter authenticity verified: {}", official),
        ));

        checks.extend(vendor_document_checks(&documents));

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "checks": &checks,
                    "extracted_data": extracted.cloned(),
                    "document_count": documents.len(),
                }),
                "Analyze the EIN letter verification results and determine if there are any\n\
                 concerns about its authenticity. Consider:\n\
                 1. EIN letter verification status\n\
                 2. EIN number format validity\n\
                 3. Business name consistency\n\
                 4. Letter authenticity indicators\n\n\
                 Your response should include:\n\
                 1. An overall assessment of the EIN letter authenticity\n\
                 2. Any specific concerns or inconsistencies\n\
                 3. Recommendations for additional verification if needed",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "EIN letter verification completed"),
            checks,
        ))
    }
}
