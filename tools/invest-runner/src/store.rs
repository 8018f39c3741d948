use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use invest_intent::plan::{BackendError, CancelRequest, RecurringPlanConfig, SchedulerBackend};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::Mutex;

/// On-disk layout of the plan store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PlanDocument {
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    plans: Vec<RecurringPlanConfig>,
}

/// Scheduling backend persisted as a single JSON file.
///
/// Every mutation rewrites the whole file atomically. One active plan per owner.
pub struct FileScheduler {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileScheduler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<PlanDocument> {
        if !self.path.exists() {
            return Ok(PlanDocument::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(PlanDocument::default());
        }
        serde_json::from_str(&raw).with_context(|| format!("failed parsing JSON in {}", self.path.display()))
    }

    fn save(&self, mut doc: PlanDocument) -> Result<()> {
        doc.updated_at = Some(
            OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_else(|_| "unknown".to_string()),
        );
        write_json_atomic(&self.path, &doc)
    }
}

fn unavailable(err: anyhow::Error) -> BackendError {
    BackendError::Unavailable(format!("{err:#}"))
}

#[async_trait]
impl SchedulerBackend for FileScheduler {
    async fn submit_config(&self, config: RecurringPlanConfig) -> Result<RecurringPlanConfig, BackendError> {
        config
            .verify()
            .map_err(|e| BackendError::Rejected(e.to_string()))?;

        let _guard = self.lock.lock().await;
        let mut doc = self.load().map_err(unavailable)?;
        if doc.plans.iter().any(|p| p.signer == config.signer) {
            return Err(BackendError::Rejected(format!(
                "{} already has an active plan",
                config.signer
            )));
        }
        doc.plans.push(config.clone());
        self.save(doc).map_err(unavailable)?;

        tracing::info!(signer = %config.signer, store = %self.path.display(), "plan stored");
        Ok(config)
    }

    async fn find_config_by_user(&self, user: Address) -> Result<Option<RecurringPlanConfig>, BackendError> {
        let _guard = self.lock.lock().await;
        let doc = self.load().map_err(unavailable)?;
        Ok(doc.plans.into_iter().find(|p| p.signer == user))
    }

    async fn cancel_config(&self, request: CancelRequest) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().map_err(unavailable)?;
        let index = doc
            .plans
            .iter()
            .position(|p| p.sig == request.sig)
            .ok_or_else(|| BackendError::NotFound(request.sig.clone()))?;
        doc.plans[index]
            .verify_cancellation(&request.signature)
            .map_err(|e| BackendError::Rejected(e.to_string()))?;

        let removed = doc.plans.remove(index);
        self.save(doc).map_err(unavailable)?;

        tracing::info!(signer = %removed.signer, store = %self.path.display(), "plan cancelled");
        Ok(())
    }
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use invest_intent::plan::{self, ActivateParams, Frequency, LocalSigner};
    use invest_intent_types::ChainId;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn temp_store(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("invest-runner-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("plans.json")
    }

    fn params() -> ActivateParams {
        ActivateParams {
            chain: ChainId::Base,
            token: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap(),
            amount: "10".into(),
            max_fee: "0.05".into(),
            frequency: Frequency::Daily,
        }
    }

    #[tokio::test]
    async fn plans_survive_reopening_the_store() {
        let path = temp_store("reopen");
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();

        let config = plan::activate(&FileScheduler::new(&path), &signer, &params(), 1)
            .await
            .unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = FileScheduler::new(&path);
        let found = reopened
            .find_config_by_user(config.signer)
            .await
            .unwrap();
        assert_eq!(found, Some(config.clone()));

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["updated_at"].is_string());

        plan::deactivate(&reopened, &config, &signer).await.unwrap();
        assert_eq!(reopened.find_config_by_user(config.signer).await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_plan_for_same_owner_is_rejected() {
        let path = temp_store("duplicate");
        let store = FileScheduler::new(&path);
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();

        plan::activate(&store, &signer, &params(), 1).await.unwrap();
        let err = plan::activate(&store, &signer, &params(), 2).await.unwrap_err();
        assert!(err.to_string().contains("already has an active plan"));
    }

    #[tokio::test]
    async fn unknown_plan_cannot_be_cancelled() {
        let store = FileScheduler::new(temp_store("unknown"));
        let err = store
            .cancel_config(CancelRequest {
                sig: "0xdead".into(),
                signature: "0xbeef".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::NotFound("0xdead".into()));
    }
}
