//! Document pipeline shared by the business agents
//!
//! Turns provider-hosted documents into classified, field-extracted records
//! usable for document-level verification. Fetch and persist are I/O;
//! PDF-to-PNG rasterization runs on the bounded CPU pool; classification
//! and extraction go through the vision LLM.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod pipeline;
pub mod prompts;
pub mod raster;

pub use pipeline::DocumentPipeline;
pub use raster::{PageRasterizer, PdfiumRasterizer, RasterPool};

/// Only the leading pages of a PDF are rasterized
pub const MAX_RASTER_PAGES: usize = 3;

/// Render scale used for OCR-quality page images
pub const RASTER_SCALE: f32 = 2.0;

/// Enumerated document kinds the classifier may assign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ArticlesOfIncorporation,
    CertificateOfOrganization,
    EinLetter,
    GovernmentId,
    BusinessLicense,
    BankStatement,
    UtilityBill,
    SecretaryOfStateFiling,
    ProofOfAddress,
    Other,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArticlesOfIncorporation => "articles_of_incorporation",
            Self::CertificateOfOrganization => "certificate_of_organization",
            Self::EinLetter => "ein_letter",
            Self::GovernmentId => "government_id",
            Self::BusinessLicense => "business_license",
            Self::BankStatement => "bank_statement",
            Self::UtilityBill => "utility_bill",
            Self::SecretaryOfStateFiling => "secretary_of_state_filing",
            Self::ProofOfAddress => "proof_of_address",
            Self::Other => "other",
        }
    }

    /// Parse a classifier-reported type, tolerating free-form phrasing
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "articles_of_incorporation" => Self::ArticlesOfIncorporation,
            "certificate_of_organization" => Self::CertificateOfOrganization,
            "ein_letter" => Self::EinLetter,
            "government_id" => Self::GovernmentId,
            "business_license" => Self::BusinessLicense,
            "bank_statement" => Self::BankStatement,
            "utility_bill" => Self::UtilityBill,
            "secretary_of_state_filing" => Self::SecretaryOfStateFiling,
            "proof_of_address" => Self::ProofOfAddress,
            _ => {
                // Free-form classifier output still lands on a kind when it
                // carries the obvious keywords
                if normalized.contains("article") || normalized.contains("incorporation") {
                    Self::ArticlesOfIncorporation
                } else if normalized.contains("organization") || normalized.contains("formation") {
                    Self::CertificateOfOrganization
                } else if normalized.contains("ein") || normalized.contains("tax_id") {
                    Self::EinLetter
                } else {
                    Self::Other
                }
            }
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying and extracting one stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    /// Classifier output (document_type, subtype, issuer, identifiers,
    /// dates, confidence, or `raw_response`/`parse_error` on bad output)
    pub classification: Value,
    /// Per-kind structured fields; `full_text` carries the raw response
    /// when parsing fails
    pub extracted_data: Value,
    /// Raw model text from the extraction call
    pub raw_text: String,
    pub page_count: usize,
    pub is_multipage: bool,
}

impl ProcessedDocument {
    /// Kind assigned by the classifier
    pub fn kind(&self) -> DocumentKind {
        self.classification["document_type"]
            .as_str()
            .map(DocumentKind::parse)
            .unwrap_or(DocumentKind::Other)
    }
}

/// Sniff a MIME type from leading magic bytes
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF-") {
        "application/pdf"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enumerated_and_freeform_kinds() {
        assert_eq!(DocumentKind::parse("ein_letter"), DocumentKind::EinLetter);
        assert_eq!(
            DocumentKind::parse("Articles of Incorporation"),
            DocumentKind::ArticlesOfIncorporation
        );
        assert_eq!(
            DocumentKind::parse("certificate-of-organization"),
            DocumentKind::CertificateOfOrganization
        );
        assert_eq!(DocumentKind::parse("paystub"), DocumentKind::Other);
    }

    #[test]
    fn sniffs_common_mime_types() {
        assert_eq!(sniff_mime(b"%PDF-1.7 ..."), "application/pdf");
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D]), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"hello"), "application/octet-stream");
    }
}
