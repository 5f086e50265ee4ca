//! Data acquisition
//!
//! The first step of both workflows. Pulls external identifiers, consults
//! the providers, and persists the aggregated payloads as verification
//! inputs keyed by data type. Every other agent reads only what this agent
//! persisted. For a business subject the UBO records are enumerated here
//! and nested under the `business` input so the workflow can fan out child
//! verifications without another provider round-trip.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::integrations::{ExternalRecordStore, FraudProvider, IdProvider, InquiryKind};
use crate::store::{AgentReport, VerificationStore};

use super::{Agent, AgentContext};

pub const AGENT_TYPE: &str = "DataAcquisitionAgent";

/// Acquires and persists all verification inputs
pub struct DataAcquisitionAgent;

#[async_trait]
impl Agent for DataAcquisitionAgent {
    fn agent_type(&self) -> &'static str {
        AGENT_TYPE
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport> {
        let mut acquired_types = Vec::new();

        if let Some(user_id) = ctx.user_id.clone() {
            let user_payload = self.acquire_user_data(ctx, &user_id).await?;
            ctx.deps
                .store
                .store_input(&ctx.verification_id, "user", user_payload)
                .await?;
            acquired_types.push("user");
        }

        if let Some(business_id) = ctx.business_id.clone() {
            let business_payload = self.acquire_business_data(ctx, &business_id).await?;
            ctx.deps
                .store
                .store_input(&ctx.verification_id, "business", business_payload)
                .await?;
            acquired_types.push("business");
        }

        if let Some(additional) = ctx.additional_data.clone() {
            ctx.deps
                .store
                .store_input(&ctx.verification_id, "additional_data", additional)
                .await?;
            acquired_types.push("additional_data");
        }

        info!(
            "Acquired {} input sections for verification {}",
            acquired_types.len(),
            ctx.verification_id
        );

        Ok(AgentReport::success(
            AGENT_TYPE,
            "Successfully acquired data from all sources",
            Vec::new(),
        )
        .with_extra("acquired", json!(acquired_types)))
    }
}

impl DataAcquisitionAgent {
    /// Assemble the `user` input: external identifiers, fraud scores, and
    /// the provider inquiry snapshot. An unreachable identifier store is
    /// fatal to acquisition; downstream provider failures degrade to empty
    /// sections instead.
    async fn acquire_user_data(&self, ctx: &AgentContext, user_id: &str) -> Result<Value> {
        let inquiry_id = ctx
            .deps
            .records
            .get_inquiry_id(user_id, InquiryKind::Kyc)
            .await?;
        info!("Provider inquiry id for user {}: {:?}", user_id, inquiry_id);

        let sift_data = match ctx.deps.records.get_fraud_scores(user_id).await {
            Ok(Some(scores)) => scores,
            // The operational database had nothing; ask the provider directly
            _ => ctx
                .deps
                .fraud
                .get_user_score(user_id)
                .await
                .unwrap_or_else(|e| {
                    warn!("Fraud score lookup failed for {}: {}", user_id, e);
                    json!({})
                }),
        };

        let persona_data = match &inquiry_id {
            Some(id) => ctx.deps.id_provider.get_inquiry(id).await.unwrap_or_else(|e| {
                warn!("Inquiry fetch failed for {}: {}", id, e);
                json!({})
            }),
            None => json!({}),
        };

        Ok(json!({
            "user_data": {
                "user_id": user_id,
                "persona_enquiry_id": inquiry_id,
            },
            "persona_data": persona_data,
            "sift_data": sift_data,
        }))
    }

    /// Assemble the `business` input, including the nested `ubos` array
    async fn acquire_business_data(&self, ctx: &AgentContext, business_id: &str) -> Result<Value> {
        let mut business_data = match ctx.deps.records.get_business_record(business_id).await {
            Ok(Some(record)) => record,
            _ => {
                warn!("Business record not found for {}", business_id);
                json!({ "business_id": business_id })
            }
        };

        let user_id = business_data["user_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if user_id.is_empty() {
            warn!("No user id on business record for {}", business_id);
        }

        let inquiry_id = ctx
            .deps
            .records
            .get_inquiry_id(&user_id, InquiryKind::Kyb)
            .await?;

        let (persona_data, business_details) = match &inquiry_id {
            Some(id) => match ctx.deps.id_provider.get_inquiry(id).await {
                Ok(inquiry) => {
                    let details = ctx.deps.id_provider.extract_business_info(&inquiry);
                    (inquiry, details)
                }
                Err(e) => {
                    warn!("Business inquiry fetch failed for {}: {}", id, e);
                    (json!({}), json!({}))
                }
            },
            None => (json!({}), json!({})),
        };

        if let Some(map) = business_data.as_object_mut() {
            map.insert("persona_inquiry_id".to_string(), json!(inquiry_id));
        }

        let owners = ctx
            .deps
            .records
            .get_business_owners(business_id)
            .await
            .unwrap_or_default();
        info!("Found {} UBOs for business {}", owners.len(), business_id);

        let mut ubos = Vec::new();
        for owner in owners {
            let ubo_user_id = owner["created_for_id"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            if ubo_user_id.is_empty() {
                warn!("UBO record without a user id on business {}", business_id);
                continue;
            }

            let owner_inquiry_id = owner["owner_inquiry_id"]
                .as_str()
                .map(str::to_string)
                .filter(|s| !s.is_empty());

            let ubo_sift_data = ctx
                .deps
                .records
                .get_fraud_scores(&ubo_user_id)
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| json!({}));

            let ubo_persona_data = match &owner_inquiry_id {
                Some(id) => ctx.deps.id_provider.get_inquiry(id).await.unwrap_or_else(|e| {
                    warn!("UBO inquiry fetch failed for {}: {}", id, e);
                    json!({})
                }),
                None => json!({}),
            };

            ubos.push(json!({
                "ubo_info": owner,
                "kyc_data": {
                    "user_data": {
                        "user_id": ubo_user_id,
                        "persona_enquiry_id": owner_inquiry_id,
                    },
                    "persona_data": ubo_persona_data,
                    "sift_data": ubo_sift_data,
                },
            }));
        }

        Ok(json!({
            "business_data": business_data,
            "persona_data": persona_data,
            "business_details": business_details,
            "ubos": ubos,
        }))
    }
}
