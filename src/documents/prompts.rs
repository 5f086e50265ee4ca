//! Vision prompts for document classification and field extraction
//!
//! The classification prompt enumerates the full kind set; extraction
//! prompts enumerate the expected field shape per kind so downstream agents
//! can rely on key names.

use super::DocumentKind;

/// Prompt asking the vision model to classify the first page
pub fn classification_prompt() -> &'static str {
    r#"Please analyze this document and determine what type of document it is. Focus especially on determining if this is one of these specific document types:

1. Articles of Incorporation / Certificate of Organization / Business Formation Document
2. EIN Letter / IRS Tax ID confirmation
3. Government ID (driver's license, passport, etc.)
4. Business License
5. Bank Statement
6. Utility Bill
7. Secretary of State filing confirmation
8. Proof of address document

Please classify the document and extract key identifying information in JSON format:

{
    "document_type": "one of: articles_of_incorporation, certificate_of_organization, ein_letter, government_id, business_license, bank_statement, utility_bill, secretary_of_state_filing, proof_of_address, other",
    "document_subtype": "More specific classification if applicable",
    "issuing_authority": "Organization that issued the document",
    "primary_entity": "The main business or person the document pertains to",
    "key_identifiers": ["List of any ID numbers, file numbers, or other key identifiers visible"],
    "dates": {
        "issue_date": "YYYY-MM-DD if visible",
        "expiration_date": "YYYY-MM-DD if visible"
    },
    "confidence": "high/medium/low - your confidence in this classification"
}

Provide the data in valid JSON format only."#
}

/// Prompt asking the vision model to extract structured fields for a kind
pub fn extraction_prompt(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::ArticlesOfIncorporation | DocumentKind::CertificateOfOrganization => {
            r#"Please analyze this business formation document (Articles of Incorporation or Certificate of Organization) and extract the following information in JSON format:

{
    "company_name": "Full legal name of the company",
    "type_of_entity": "LLC, Corporation, etc.",
    "state_of_incorporation": "State where incorporated",
    "date_of_incorporation": "Date in YYYY-MM-DD format",
    "registered_agent": "Name of the registered agent",
    "registered_office_address": "Address of the registered office",
    "business_purpose": "Stated purpose of the business",
    "authorized_shares": "Number of authorized shares (if applicable)",
    "incorporators": ["List of incorporator names"],
    "directors": ["List of director names if present"],
    "filing_number": "Document filing number if present",
    "effective_date": "Effective date of the document if different from incorporation date"
}

Provide the data in valid JSON format only. If any field is not found in the document, leave it as an empty string."#
        }
        DocumentKind::EinLetter => {
            r#"Please analyze this EIN (Employer Identification Number) letter or tax ID confirmation and extract the following information in JSON format:

{
    "company_name": "Business name as it appears on the letter",
    "ein": "The EIN number (XX-XXXXXXX format)",
    "address": "Business address",
    "issue_date": "Date the EIN was issued (YYYY-MM-DD format)",
    "tax_classification": "Tax classification if mentioned (e.g., S-Corp, LLC, etc.)",
    "is_official_irs_letter": true,
    "letter_type": "SS-4, CP-575, 147C, etc.",
    "responsible_party": "Name of the responsible party if mentioned"
}

Provide the data in valid JSON format only. If any field is not found in the document, leave it as an empty string."#
        }
        DocumentKind::BusinessLicense => {
            r#"Please analyze this business license document and extract the following information in JSON format:

{
    "business_name": "Full legal name of the business",
    "license_number": "The business license number",
    "license_type": "Type of license",
    "issuing_authority": "Authority that issued the license",
    "issue_date": "Date issued in YYYY-MM-DD format",
    "expiration_date": "Expiration date in YYYY-MM-DD format",
    "business_address": "Physical address of the business",
    "business_owner": "Name of the business owner if listed",
    "business_activity": "Licensed business activity or classification"
}

Provide the data in valid JSON format only. If any field is not found in the document, leave it as an empty string."#
        }
        DocumentKind::SecretaryOfStateFiling => {
            r#"Please analyze this Secretary of State filing document and extract the following information in JSON format:

{
    "business_name": "Full legal name of the business",
    "filing_number": "The filing or document number",
    "filing_type": "Type of filing (annual report, etc.)",
    "filing_date": "Date of filing in YYYY-MM-DD format",
    "effective_date": "Effective date in YYYY-MM-DD format if different",
    "status": "Business status (active, dissolved, etc.)",
    "jurisdiction": "State or jurisdiction of filing",
    "registered_agent": "Name of registered agent if present",
    "business_address": "Business address if listed"
}

Provide the data in valid JSON format only. If any field is not found in the document, leave it as an empty string."#
        }
        _ => {
            r#"Please analyze this document and extract all relevant business verification information. Look for:

1. Any business name, EIN/Tax ID numbers, or business identifiers
2. Business formation information (type, date, state)
3. Business address or contact information
4. Any official filing numbers or reference numbers
5. Any dates (issue dates, effective dates, expiration dates)
6. Names of owners, officers, directors, or registered agents
7. Any compliance or status information

Provide the data in JSON format:

{
    "document_type": "Your assessment of what type of document this is",
    "business_name": "Name of the business if present",
    "business_identifiers": {
        "ein": "Tax ID if present",
        "filing_number": "Any filing or registration numbers",
        "other_ids": ["Any other identifying numbers found"]
    },
    "business_details": {
        "type": "Business entity type if present",
        "formation_date": "Date in YYYY-MM-DD format if present",
        "jurisdiction": "State or jurisdiction if present"
    },
    "addresses": ["All business addresses found"],
    "key_individuals": ["Names of owners/officers/agents found"],
    "key_dates": {
        "issue_date": "YYYY-MM-DD if present",
        "effective_date": "YYYY-MM-DD if present",
        "expiration_date": "YYYY-MM-DD if present"
    },
    "status": "Any status information found"
}

Provide the data in valid JSON format only. If any field is not found in the document, leave it as an empty string or empty array."#
        }
    }
}
