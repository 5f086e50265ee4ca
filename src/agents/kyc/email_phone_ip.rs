//! Email, phone, and IP verification

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::IpAddr;

use crate::agents::helpers::{summary_or, user_sections};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};
use crate::utils::validation::is_valid_phone;

/// Disposable-email domains that fail the email check outright
const DISPOSABLE_DOMAINS: &[&str] = &["tempmail.com", "throwaway.com", "fakeemail.com"];

/// Whether an address sits in a private or otherwise non-routable range
pub(crate) fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

/// Domain blacklist, E.164, and per-IP checks
pub struct EmailPhoneIpVerificationAgent;

#[async_trait]
impl Agent for EmailPhoneIpVerificationAgent {
    fn agent_type(&self) -> &'static str {
        "EmailPhoneIpVerificationAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (user_data, _, _) = user_sections(&inputs);

        let email = user_data["email"].as_str().unwrap_or_default();
        let phone = user_data["phone"].as_str().unwrap_or_default();
        let login_activities = user_data["login_activities"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let ip_addresses: Vec<String> = login_activities
            .iter()
            .filter_map(|a| a["ip"].as_str())
            .map(str::to_string)
            .collect();
        let devices: Vec<String> = login_activities
            .iter()
            .filter_map(|a| a["device"].as_str())
            .map(str::to_string)
            .collect();

        let mut checks = Vec::new();

        let email_domain = email.split('@').nth(1).unwrap_or_default();
        let email_suspicious = DISPOSABLE_DOMAINS
            .iter()
            .any(|domain| email_domain.contains(domain));
        checks.push(Check::new(
            "Email Verification",
            if email_suspicious {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            if email_suspicious {
                format!("Email domain is suspicious: {}", email_domain)
            } else {
                format!("Email domain verified: {}", email_domain)
            },
        ));

        let phone_valid = is_valid_phone(phone);
        checks.push(Check::new(
            "Phone Verification",
            if phone_valid {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            if phone_valid {
                format!("Phone number verified: {}", phone)
            } else {
                format!("Invalid phone number format: {}", phone)
            },
        ));

        let mut ip_checks: Vec<Value> = Vec::new();
        for ip in ip_addresses.iter().filter(|ip| !ip.is_empty()) {
            match ip.parse::<IpAddr>() {
                Ok(parsed) => {
                    let private = is_private_ip(parsed);
                    ip_checks.push(json!({
                        "ip": ip,
                        "private": private,
                        "suspicious": private,
                        "status": if private { "failed" } else { "passed" },
                    }));
                }
                Err(_) => {
                    ip_checks.push(json!({
                        "ip": ip,
                        "status": "failed",
                        "details": format!("Invalid IP format: {}", ip),
                    }));
                }
            }
        }

        let ip_status = if ip_checks.is_empty() || ip_checks.iter().any(|c| c["status"] == "failed")
        {
            CheckStatus::Failed
        } else {
            CheckStatus::Passed
        };
        let suspicious_count = ip_checks
            .iter()
            .filter(|c| c["suspicious"].as_bool().unwrap_or(false))
            .count();
        checks.push(
            Check::new(
                "IP Verification",
                ip_status,
                format!(
                    "IPs verified: {}, Suspicious IPs: {}",
                    ip_checks.len(),
                    suspicious_count
                ),
            )
            .with_metadata(json!({ "ip_checks": ip_checks })),
        );

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "checks": &checks,
                    "email": email,
                    "phone": phone,
                    "ip_addresses": ip_addresses,
                    "devices": devices,
                }),
                "Analyze the email, phone, and IP verification results and identify any suspicious patterns.\n\
                 Consider the following:\n\
                 1. Is the email domain suspicious or associated with temporary email services?\n\
                 2. Is the phone number format valid and does it match the expected region?\n\
                 3. Are the IP addresses from suspicious regions or known proxy/VPN services?\n\
                 4. Are there any inconsistencies between login locations and provided address?\n\n\
                 Your response should include:\n\
                 1. An overall risk assessment for these verification factors\n\
                 2. Specific suspicious patterns identified, if any\n\
                 3. Recommendations for additional verification steps",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Email, phone, and IP verification completed"),
            checks,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_ranges_are_flagged() {
        assert!(is_private_ip("192.168.1.1".parse().unwrap()));
        assert!(is_private_ip("10.0.0.5".parse().unwrap()));
        assert!(is_private_ip("127.0.0.1".parse().unwrap()));
        assert!(!is_private_ip("8.8.8.8".parse().unwrap()));
    }
}
