//! In-memory verification store
//!
//! Backs the integration tests and embedded runs. Append order is a single
//! monotone counter shared across tables so ordering assertions behave like
//! the serial ids of the PostgreSQL store.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::utils::normalize_dates;

use super::types::{
    AgentReport, AgentResultRow, ApiKey, ListFilter, UboLink, User, Verification,
    VerificationInput, VerificationKind, VerificationOutcome, VerificationStatus,
};
use super::{AuthStore, VerificationStore};

#[derive(Default)]
struct Inner {
    next_id: i64,
    verifications: HashMap<String, Verification>,
    inputs: Vec<VerificationInput>,
    results: Vec<AgentResultRow>,
    ubo_links: Vec<UboLink>,
    api_keys: Vec<ApiKey>,
    users: Vec<User>,
}

impl Inner {
    fn bump(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Thread-safe in-memory store
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn create_verification(
        &self,
        verification_id: &str,
        user_id: Option<&str>,
        business_id: Option<&str>,
        status: VerificationStatus,
    ) -> Result<Verification> {
        if user_id.is_some() == business_id.is_some() {
            bail!("exactly one of user_id / business_id must be set");
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.verifications.contains_key(verification_id) {
            bail!("verification {} already exists", verification_id);
        }
        let now = Utc::now();
        let verification = Verification {
            verification_id: verification_id.to_string(),
            user_id: user_id.map(str::to_string),
            business_id: business_id.map(str::to_string),
            status,
            result: None,
            reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        inner
            .verifications
            .insert(verification_id.to_string(), verification.clone());
        Ok(verification)
    }

    async fn get_verification(&self, verification_id: &str) -> Result<Option<Verification>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .verifications
            .get(verification_id)
            .cloned())
    }

    async fn update_verification_status(
        &self,
        verification_id: &str,
        status: VerificationStatus,
        result: Option<VerificationOutcome>,
        reason: Option<&str>,
    ) -> Result<Option<Verification>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(verification) = inner.verifications.get_mut(verification_id) else {
            return Ok(None);
        };
        verification.status = status;
        if result.is_some() {
            verification.result = result;
        }
        if let Some(reason) = reason {
            verification.reason = Some(reason.to_string());
        }
        verification.updated_at = Utc::now();
        if status.is_terminal() {
            verification.completed_at = Some(Utc::now());
        }
        Ok(Some(verification.clone()))
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<Verification>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .verifications
            .values()
            .filter(|v| v.user_id.as_deref() == Some(user_id))
            .max_by_key(|v| v.created_at)
            .cloned())
    }

    async fn latest_for_business(&self, business_id: &str) -> Result<Option<Verification>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .verifications
            .values()
            .filter(|v| v.business_id.as_deref() == Some(business_id))
            .max_by_key(|v| v.created_at)
            .cloned())
    }

    async fn list_verifications(
        &self,
        kind: VerificationKind,
        filter: &ListFilter,
    ) -> Result<(Vec<Verification>, i64)> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<Verification> = inner
            .verifications
            .values()
            .filter(|v| v.kind() == kind)
            .filter(|v| filter.status.map(|s| v.status == s).unwrap_or(true))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn store_input(
        &self,
        verification_id: &str,
        data_type: &str,
        mut data: Value,
    ) -> Result<VerificationInput> {
        normalize_dates(&mut data);
        let mut inner = self.inner.lock().unwrap();
        let id = inner.bump();
        let input = VerificationInput {
            id,
            verification_id: verification_id.to_string(),
            data_type: data_type.to_string(),
            data,
            created_at: Utc::now(),
        };
        inner.inputs.push(input.clone());
        Ok(input)
    }

    async fn get_inputs(
        &self,
        verification_id: &str,
        data_type: Option<&str>,
    ) -> Result<Vec<VerificationInput>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .inputs
            .iter()
            .filter(|i| i.verification_id == verification_id)
            .filter(|i| data_type.map(|t| i.data_type == t).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn store_agent_result(
        &self,
        verification_id: &str,
        report: &AgentReport,
    ) -> Result<AgentResultRow> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.bump();
        let row = AgentResultRow {
            id,
            verification_id: verification_id.to_string(),
            report: report.clone(),
            created_at: Utc::now(),
        };
        inner.results.push(row.clone());
        Ok(row)
    }

    async fn get_agent_results(&self, verification_id: &str) -> Result<Vec<AgentResultRow>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .results
            .iter()
            .filter(|r| r.verification_id == verification_id)
            .cloned()
            .collect())
    }

    async fn store_ubo_link(
        &self,
        verification_id: &str,
        ubo_user_id: &str,
        ubo_verification_id: &str,
    ) -> Result<UboLink> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.bump();
        let link = UboLink {
            id,
            verification_id: verification_id.to_string(),
            ubo_user_id: ubo_user_id.to_string(),
            ubo_verification_id: ubo_verification_id.to_string(),
            created_at: Utc::now(),
        };
        inner.ubo_links.push(link.clone());
        Ok(link)
    }

    async fn get_ubo_links(&self, verification_id: &str) -> Result<Vec<UboLink>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .ubo_links
            .iter()
            .filter(|l| l.verification_id == verification_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn create_api_key(
        &self,
        key_value: &str,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKey> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.bump();
        let key = ApiKey {
            id,
            key_value: key_value.to_string(),
            name: name.to_string(),
            is_active: true,
            expires_at,
            created_at: Utc::now(),
        };
        inner.api_keys.push(key.clone());
        Ok(key)
    }

    async fn get_api_key(&self, key_value: &str) -> Result<Option<ApiKey>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .api_keys
            .iter()
            .find(|k| k.key_value == key_value)
            .cloned())
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>> {
        Ok(self.inner.lock().unwrap().api_keys.clone())
    }

    async fn deactivate_api_key(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.api_keys.iter_mut().find(|k| k.id == id) {
            Some(key) => {
                key.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.bump();
        let user = User {
            id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_active: true,
            is_admin,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }
}
