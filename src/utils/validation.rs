//! Inbound request validation
//!
//! Submission payloads are checked before any verification row is created;
//! failures map to HTTP 422 at the façade.

use serde_json::Value;

use crate::error::EngineError;

/// Validate an E.164 phone number (`+` followed by 2-15 digits)
pub fn is_valid_phone(phone: &str) -> bool {
    let mut chars = phone.chars();
    if chars.next() != Some('+') {
        return false;
    }
    let digits: Vec<char> = chars.collect();
    digits.len() >= 2
        && digits.len() <= 15
        && digits[0] != '0'
        && digits.iter().all(|c| c.is_ascii_digit())
}

/// Validate a KYC submission: `user_id` present and non-empty
pub fn validate_kyc_request(user_id: &str, additional_data: Option<&Value>) -> Result<(), EngineError> {
    if user_id.trim().is_empty() {
        return Err(EngineError::Validation("user_id is required".into()));
    }
    validate_additional_data(additional_data)
}

/// Validate a KYB submission: `business_id` present and non-empty
pub fn validate_business_request(
    business_id: &str,
    additional_data: Option<&Value>,
) -> Result<(), EngineError> {
    if business_id.trim().is_empty() {
        return Err(EngineError::Validation("business_id is required".into()));
    }
    validate_additional_data(additional_data)
}

fn validate_additional_data(additional_data: Option<&Value>) -> Result<(), EngineError> {
    match additional_data {
        None => Ok(()),
        Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(EngineError::Validation(
            "additional_data must be an object".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn phone_format() {
        assert!(is_valid_phone("+14155552671"));
        assert!(!is_valid_phone("14155552671"));
        assert!(!is_valid_phone("+0123"));
        assert!(!is_valid_phone("+1-415-555"));
    }

    #[test]
    fn kyc_request_requires_user_id() {
        assert!(validate_kyc_request("u1", None).is_ok());
        assert!(validate_kyc_request("", None).is_err());
        assert!(validate_kyc_request("u1", Some(&json!({"k": 1}))).is_ok());
        assert!(validate_kyc_request("u1", Some(&json!([1, 2]))).is_err());
    }

    #[test]
    fn business_request_requires_business_id() {
        assert!(validate_business_request("b1", None).is_ok());
        assert!(validate_business_request("  ", None).is_err());
    }
}
