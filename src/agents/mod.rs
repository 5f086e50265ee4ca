//! Agent runtime and catalog
//!
//! Every agent is a pure function of the persisted verification inputs plus
//! its designated provider capabilities, producing a deterministic list of
//! checks. The LLM is used only to synthesize the human-facing `details`
//! narrative and risk rollups, never to adjudicate a single check. An
//! agent that fails for any reason is materialized as an error report; it
//! never takes the workflow down with it.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use crate::documents::DocumentPipeline;
use crate::integrations::{
    BlobStore, ExternalRecordStore, FraudProvider, IdProvider, RegistryProvider, SanctionsProvider,
};
use crate::llm::LlmPool;
use crate::store::{AgentReport, VerificationStore};

pub mod compilation;
pub mod data_acquisition;
pub mod kyb;
pub mod kyc;

pub use compilation::{BusinessResultCompilationAgent, ResultCompilationAgent};
pub use data_acquisition::DataAcquisitionAgent;

/// Everything an agent may touch, shared across the worker process
pub struct EngineDeps {
    pub store: Arc<dyn VerificationStore>,
    pub records: Arc<dyn ExternalRecordStore>,
    pub id_provider: Arc<dyn IdProvider>,
    pub fraud: Arc<dyn FraudProvider>,
    pub sanctions: Arc<dyn SanctionsProvider>,
    pub registry: Arc<dyn RegistryProvider>,
    pub blobs: Arc<dyn BlobStore>,
    pub llm: LlmPool,
    pub documents: DocumentPipeline,
}

/// Per-run context handed to every agent
#[derive(Clone)]
pub struct AgentContext {
    pub verification_id: String,
    pub user_id: Option<String>,
    pub business_id: Option<String>,
    pub additional_data: Option<Value>,
    /// Child verification ids for the business compilation join
    pub ubo_verification_ids: Vec<String>,
    pub deps: Arc<EngineDeps>,
}

impl AgentContext {
    pub fn new(verification_id: impl Into<String>, deps: Arc<EngineDeps>) -> Self {
        Self {
            verification_id: verification_id.into(),
            user_id: None,
            business_id: None,
            additional_data: None,
            ubo_verification_ids: Vec::new(),
            deps,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_business(mut self, business_id: impl Into<String>) -> Self {
        self.business_id = Some(business_id.into());
        self
    }

    pub fn with_additional_data(mut self, additional_data: Option<Value>) -> Self {
        self.additional_data = additional_data;
        self
    }

    pub fn with_ubo_verifications(mut self, ids: Vec<String>) -> Self {
        self.ubo_verification_ids = ids;
        self
    }

    /// All persisted inputs for this verification grouped by data type;
    /// the latest row wins per type
    pub async fn inputs(&self) -> Result<HashMap<String, Value>> {
        let rows = self
            .deps
            .store
            .get_inputs(&self.verification_id, None)
            .await?;
        let mut grouped = HashMap::new();
        for row in rows {
            grouped.insert(row.data_type, row.data);
        }
        Ok(grouped)
    }

    /// Run the shared LLM analysis helper through the bounded client pool
    pub async fn analyze_with_llm(&self, data: &Value, instructions: &str) -> Result<Value> {
        self.deps.llm.extract_structured(data, instructions).await
    }
}

/// A deterministic unit of verification work
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable type tag recorded on the agent's results
    fn agent_type(&self) -> &'static str;

    /// Execute against the context; errors are caught by the runner
    async fn execute(&self, ctx: &AgentContext) -> Result<AgentReport>;
}

/// Run one agent with the universal error catch: a raised error becomes an
/// `AgentReport { status: error, checks: [] }` instead of propagating
pub async fn run_agent(agent: &dyn Agent, ctx: &AgentContext) -> AgentReport {
    match agent.execute(ctx).await {
        Ok(report) => report,
        Err(e) => {
            error!(
                "Agent {} failed for verification {}: {}",
                agent.agent_type(),
                ctx.verification_id,
                e
            );
            AgentReport::error(agent.agent_type(), format!("Error during execution: {}", e))
        }
    }
}

/// The ten individual-subject verification agents, in catalog order
pub fn individual_agents() -> Vec<Arc<dyn Agent>> {
    vec![
        Arc::new(kyc::InitialDiligenceAgent) as Arc<dyn Agent>,
        Arc::new(kyc::GovtIdVerificationAgent),
        Arc::new(kyc::IdSelfieVerificationAgent),
        Arc::new(kyc::AamvaVerificationAgent),
        Arc::new(kyc::EmailPhoneIpVerificationAgent),
        Arc::new(kyc::PaymentBehaviorAgent),
        Arc::new(kyc::LoginActivitiesAgent),
        Arc::new(kyc::SiftVerificationAgent),
        Arc::new(kyc::IdCheckAgent),
        Arc::new(kyc::OfacVerificationAgent),
    ]
}

/// The five business-subject verification agents, in catalog order
pub fn business_agents() -> Vec<Arc<dyn Agent>> {
    vec![
        Arc::new(kyb::NormalDiligenceAgent) as Arc<dyn Agent>,
        Arc::new(kyb::IrsMatchAgent),
        Arc::new(kyb::SosFilingsAgent),
        Arc::new(kyb::EinLetterAgent),
        Arc::new(kyb::ArticlesIncorporationAgent),
    ]
}

/// Shared accessors over persisted provider payloads
pub mod helpers {
    use serde_json::Value;

    /// First `included` item of the given type on a provider inquiry
    pub fn find_included<'a>(inquiry: &'a Value, type_name: &str) -> Option<&'a Value> {
        inquiry["included"]
            .as_array()?
            .iter()
            .find(|item| item["type"] == type_name)
    }

    /// Named check inside a provider verification item
    pub fn find_check<'a>(verification: &'a Value, name: &str) -> Option<&'a Value> {
        verification["checks"]
            .as_array()?
            .iter()
            .find(|check| check["name"] == name)
    }

    /// Status string of a provider check, defaulting to `not_applicable`
    pub fn check_status(verification: Option<&Value>, name: &str) -> String {
        verification
            .and_then(|v| find_check(v, name))
            .and_then(|c| c["status"].as_str())
            .unwrap_or("not_applicable")
            .to_string()
    }

    /// Human summary from an LLM analysis payload, with a fallback
    pub fn summary_or(analysis: &Value, fallback: &str) -> String {
        analysis["summary"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// The `user` input sections: (user_data, persona_data, sift_data)
    pub fn user_sections(
        inputs: &std::collections::HashMap<String, Value>,
    ) -> (Value, Value, Value) {
        let user = inputs.get("user").cloned().unwrap_or(Value::Null);
        (
            user["user_data"].clone(),
            user["persona_data"].clone(),
            user["sift_data"].clone(),
        )
    }

    /// The `business` input sections:
    /// (business_data, persona_data, business_details)
    pub fn business_sections(
        inputs: &std::collections::HashMap<String, Value>,
    ) -> (Value, Value, Value) {
        let business = inputs.get("business").cloned().unwrap_or(Value::Null);
        (
            business["business_data"].clone(),
            business["persona_data"].clone(),
            business["business_details"].clone(),
        )
    }

    /// Non-empty string at a JSON path, trimmed
    pub fn str_at(value: &Value, pointer: &str) -> Option<String> {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Value of a named Persona field (`fields[name]["value"]`)
    pub fn persona_field(persona_data: &Value, name: &str) -> Option<String> {
        persona_data["data"]["attributes"]["fields"][name]["value"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
