//! Login activity analysis

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::IpAddr;

use crate::agents::helpers::{summary_or, user_sections};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

use super::email_phone_ip::is_private_ip;

/// Logins from different locations closer than this are impossible travel
const IMPOSSIBLE_TRAVEL_HOURS: i64 = 2;

/// More unique devices than this fails the device check
const MAX_UNIQUE_DEVICES: usize = 5;

/// More failed logins than this fails the failure check
const MAX_FAILED_LOGINS: usize = 3;

fn login_date(activity: &Value) -> Option<DateTime<Utc>> {
    activity["date"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Impossible travel, device spread, IP reputation, and failed logins
pub struct LoginActivitiesAgent;

#[async_trait]
impl Agent for LoginActivitiesAgent {
    fn agent_type(&self) -> &'static str {
        "LoginActivitiesAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (user_data, _, sift_data) = user_sections(&inputs);

        let login_activities = user_data["login_activities"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let sift_activities = sift_data["user"]["activities"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let sift_logins: Vec<&Value> = sift_activities
            .iter()
            .filter(|a| a["type"] == "login")
            .collect();

        let mut checks = Vec::new();

        // Impossible travel: different locations on consecutive logins
        // inside the travel window
        let mut dated: Vec<&Value> = login_activities
            .iter()
            .filter(|a| login_date(a).is_some())
            .collect();
        dated.sort_by_key(|a| login_date(a).unwrap_or(DateTime::<Utc>::MIN_UTC));

        let mut impossible_travel = false;
        for pair in dated.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            let previous_location = previous["location"].as_str().unwrap_or_default();
            let current_location = current["location"].as_str().unwrap_or_default();
            if previous_location != current_location {
                if let (Some(prev_at), Some(curr_at)) = (login_date(previous), login_date(current))
                {
                    if curr_at - prev_at < chrono::Duration::hours(IMPOSSIBLE_TRAVEL_HOURS) {
                        impossible_travel = true;
                        break;
                    }
                }
            }
        }

        let unique_locations: HashSet<&str> = login_activities
            .iter()
            .filter_map(|a| a["location"].as_str())
            .collect();
        checks.push(Check::new(
            "Login Location Analysis",
            if impossible_travel {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Unique locations: {}, Impossible travel detected: {}",
                unique_locations.len(),
                impossible_travel
            ),
        ));

        let unique_devices: HashSet<&str> = login_activities
            .iter()
            .filter_map(|a| a["device"].as_str())
            .collect();
        let excessive_devices = unique_devices.len() > MAX_UNIQUE_DEVICES;
        checks.push(Check::new(
            "Device Analysis",
            if excessive_devices {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Unique devices: {}, Excessive devices: {}",
                unique_devices.len(),
                excessive_devices
            ),
        ));

        let suspicious_ips: Vec<&str> = login_activities
            .iter()
            .filter_map(|a| a["ip"].as_str())
            .filter(|ip| !ip.is_empty())
            .filter(|ip| match ip.parse::<IpAddr>() {
                Ok(parsed) => is_private_ip(parsed),
                Err(_) => true,
            })
            .collect();
        checks.push(Check::new(
            "IP Analysis",
            if suspicious_ips.is_empty() {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!("Suspicious IPs: {}", suspicious_ips.len()),
        ));

        let failed_logins = sift_logins
            .iter()
            .filter(|a| a["status"] != "success")
            .count();
        let excessive_failures = failed_logins > MAX_FAILED_LOGINS;
        checks.push(Check::new(
            "Login Failure Analysis",
            if excessive_failures {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Failed login attempts: {}, Excessive failures: {}",
                failed_logins, excessive_failures
            ),
        ));

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "checks": &checks,
                    "login_activities": login_activities,
                    "sift_logins": sift_logins,
                }),
                "Analyze the login activities to identify any suspicious patterns or security risks.\n\
                 Consider:\n\
                 1. Login locations and potential impossible travel between locations\n\
                 2. Number and variety of devices used\n\
                 3. IP addresses and their reputation\n\
                 4. Failed login attempts\n\n\
                 Your response should include:\n\
                 1. An overall risk assessment of the login behavior\n\
                 2. Specific suspicious patterns or anomalies detected\n\
                 3. Recommendations for additional security measures",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Login activities analysis completed"),
            checks,
        ))
    }
}
