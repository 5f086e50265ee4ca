//! Payment behavior analysis

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::agents::helpers::{summary_or, user_sections};
use crate::agents::{Agent, AgentContext};
use crate::store::{AgentReport, Check, CheckStatus};

/// Transactions above this amount count as large
const LARGE_TRANSACTION_AMOUNT: f64 = 5000.0;

/// Consecutive transactions closer than this count as rapid
const RAPID_WINDOW_MINUTES: i64 = 10;

/// Payment-abuse sub-score above this fails the check
const PAYMENT_ABUSE_THRESHOLD: f64 = 50.0;

fn parse_date(tx: &Value) -> Option<DateTime<Utc>> {
    tx["date"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Bank-account, transaction-pattern, and payment-abuse checks
pub struct PaymentBehaviorAgent;

#[async_trait]
impl Agent for PaymentBehaviorAgent {
    fn agent_type(&self) -> &'static str {
        "PaymentBehaviorAgent"
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let inputs = ctx.inputs().await?;
        let (user_data, _, sift_data) = user_sections(&inputs);

        let bank_accounts = user_data["bank_accounts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let payment_abuse_score = sift_data["scores"]["payment_abuse"].as_f64().unwrap_or(0.0);

        let mut checks = Vec::new();

        let verified_count = bank_accounts
            .iter()
            .filter(|a| a["verified"].as_bool().unwrap_or(false))
            .count();
        checks.push(Check::new(
            "Bank Account Verification",
            if verified_count > 0 {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            format!("Verified bank accounts: {}", verified_count),
        ));

        let mut all_transactions: Vec<Value> = Vec::new();
        for account in &bank_accounts {
            if let Some(transactions) = account["last_transactions"].as_array() {
                all_transactions.extend(transactions.iter().cloned());
            }
        }

        if all_transactions.is_empty() {
            checks.push(Check::new(
                "Transaction Pattern Analysis",
                CheckStatus::NotApplicable,
                "No transaction history available",
            ));
        } else {
            let mut sorted = all_transactions.clone();
            sorted.sort_by_key(|tx| parse_date(tx).unwrap_or(DateTime::<Utc>::MIN_UTC));

            let large_count = sorted
                .iter()
                .filter(|tx| tx["amount"].as_f64().unwrap_or(0.0) > LARGE_TRANSACTION_AMOUNT)
                .count();

            let mut rapid_count = 0;
            for pair in sorted.windows(2) {
                if let (Some(previous), Some(current)) = (parse_date(&pair[0]), parse_date(&pair[1]))
                {
                    if current - previous < chrono::Duration::minutes(RAPID_WINDOW_MINUTES) {
                        rapid_count += 1;
                    }
                }
            }

            let risky = large_count > 2 || rapid_count > 1;
            checks.push(Check::new(
                "Transaction Pattern Analysis",
                if risky {
                    CheckStatus::Failed
                } else {
                    CheckStatus::Passed
                },
                format!(
                    "Large transactions: {}, Rapid transactions: {}",
                    large_count, rapid_count
                ),
            ));
        }

        checks.push(Check::new(
            "Sift Payment Abuse Score",
            if payment_abuse_score > PAYMENT_ABUSE_THRESHOLD {
                CheckStatus::Failed
            } else {
                CheckStatus::Passed
            },
            format!(
                "Payment abuse score: {}, threshold: {}",
                payment_abuse_score, PAYMENT_ABUSE_THRESHOLD
            ),
        ));

        let analysis = ctx
            .analyze_with_llm(
                &json!({
                    "checks": &checks,
                    "bank_accounts": bank_accounts,
                    "all_transactions": all_transactions,
                    "payment_abuse_score": payment_abuse_score,
                }),
                "Analyze the payment behavior and bank account information to identify any\n\
                 suspicious patterns or fraud indicators. Consider:\n\
                 1. Bank account verification status\n\
                 2. Transaction patterns, focusing on unusually large or frequent transactions\n\
                 3. Payment abuse risk score\n\n\
                 Your response should include:\n\
                 1. An overall risk assessment of the payment behavior\n\
                 2. Specific suspicious patterns or red flags identified\n\
                 3. Recommendations for additional verification or monitoring",
            )
            .await?;

        Ok(AgentReport::success(
            self.agent_type(),
            summary_or(&analysis, "Payment behavior analysis completed"),
            checks,
        ))
    }
}
