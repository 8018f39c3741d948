//! Scheduling backend boundary.

use std::collections::HashMap;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use super::config::RecurringPlanConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend refused the request (bad signature, duplicate plan, ...).
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("plan {0} not found")]
    NotFound(String),
    /// The request did not complete.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Cancellation of the plan identified by `sig`, signed by its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub sig: String,
    pub signature: String,
}

/// Stores signed plans and triggers their execution.
#[async_trait]
pub trait SchedulerBackend: Send + Sync {
    /// Store a signed plan and return it as persisted.
    async fn submit_config(&self, config: RecurringPlanConfig) -> Result<RecurringPlanConfig, BackendError>;

    /// Active plan owned by `user`, if any.
    async fn find_config_by_user(&self, user: Address) -> Result<Option<RecurringPlanConfig>, BackendError>;

    async fn cancel_config(&self, request: CancelRequest) -> Result<(), BackendError>;
}

/// In-process backend holding one active plan per owner.
#[derive(Debug, Default)]
pub struct MemoryScheduler {
    configs: RwLock<HashMap<Address, RecurringPlanConfig>>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.configs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.configs.read().await.is_empty()
    }
}

#[async_trait]
impl SchedulerBackend for MemoryScheduler {
    async fn submit_config(&self, config: RecurringPlanConfig) -> Result<RecurringPlanConfig, BackendError> {
        config
            .verify()
            .map_err(|e| BackendError::Rejected(e.to_string()))?;

        let mut configs = self.configs.write().await;
        if configs.contains_key(&config.signer) {
            return Err(BackendError::Rejected(format!(
                "{} already has an active plan",
                config.signer
            )));
        }
        configs.insert(config.signer, config.clone());
        tracing::info!(signer = %config.signer, sig = %config.sig, "plan stored");
        Ok(config)
    }

    async fn find_config_by_user(&self, user: Address) -> Result<Option<RecurringPlanConfig>, BackendError> {
        Ok(self.configs.read().await.get(&user).cloned())
    }

    async fn cancel_config(&self, request: CancelRequest) -> Result<(), BackendError> {
        let mut configs = self.configs.write().await;
        let owner = configs
            .values()
            .find(|c| c.sig == request.sig)
            .ok_or_else(|| BackendError::NotFound(request.sig.clone()))?;
        owner
            .verify_cancellation(&request.signature)
            .map_err(|e| BackendError::Rejected(e.to_string()))?;

        let signer = owner.signer;
        configs.remove(&signer);
        tracing::info!(%signer, sig = %request.sig, "plan cancelled");
        Ok(())
    }
}
