//! Task entrypoint: validates the runner-supplied records and reports a
//! [`TaskResult`] instead of an error.

use alloy_primitives::Address;
use invest_intent_types::{ChainId, ChainReader, Intent};
use serde::{Deserialize, Serialize};

use crate::{
    errors::InvestError,
    intent::{build_invest_intent, InvestRequest},
    plan::PlanInput,
    registry::Registry,
};

/// Version of the [`TaskContext`] record understood by this task.
pub const CONTEXT_VERSION: u16 = 1;

/// Input record injected by the runner (or replayed by a recurring plan).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInputs {
    pub chain_id: u64,
    /// Token address, or a registry symbol such as `USDC`.
    pub token: String,
    pub amount: String,
    pub max_fee: String,
}

/// A stored plan's input, replayed as-is on every scheduled run.
impl From<&PlanInput> for TaskInputs {
    fn from(input: &PlanInput) -> Self {
        Self {
            chain_id: input.chain_id,
            token: input.token.to_string(),
            amount: input.amount.clone(),
            max_fee: input.max_fee.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settler {
    pub address: Address,
    pub chain_id: u64,
}

/// Execution context supplied by the runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    #[serde(default = "default_context_version")]
    pub version: u16,
    pub user: Address,
    pub settlers: Vec<Settler>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

fn default_context_version() -> u16 {
    CONTEXT_VERSION
}

impl TaskContext {
    pub fn new(user: Address, settlers: Vec<Settler>, timestamp: u64) -> Self {
        Self {
            version: CONTEXT_VERSION,
            user,
            settlers,
            timestamp,
        }
    }

    /// Check the record and pick the settler for `chain_id`.
    ///
    /// A settler registered for the chain wins; otherwise the first entry is used.
    pub fn settler_for(&self, chain_id: u64) -> Result<Address, InvestError> {
        if self.version != CONTEXT_VERSION {
            return Err(InvestError::InvalidContext(format!(
                "unsupported context version {}",
                self.version
            )));
        }
        self.settlers
            .iter()
            .find(|s| s.chain_id == chain_id)
            .or_else(|| self.settlers.first())
            .map(|s| s.address)
            .ok_or_else(|| InvestError::InvalidContext("no settlers configured".to_string()))
    }
}

/// Outcome reported back to the runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub timestamp: u64,
    /// Exactly one intent on success, none on failure.
    pub intents: Vec<Intent>,
    /// One line per failure, including the offending value.
    pub logs: Vec<String>,
}

/// Run the invest task once.
pub async fn run_task<R>(
    registry: &Registry,
    reader: &R,
    inputs: &TaskInputs,
    context: &TaskContext,
) -> TaskResult
where
    R: ChainReader + ?Sized,
{
    match execute(registry, reader, inputs, context).await {
        Ok(intent) => TaskResult {
            success: true,
            timestamp: context.timestamp,
            intents: vec![intent],
            logs: Vec::new(),
        },
        Err(err) => {
            tracing::error!(chain = inputs.chain_id, user = %context.user, "invest task failed: {err}");
            TaskResult {
                success: false,
                timestamp: context.timestamp,
                intents: Vec::new(),
                logs: vec![err.to_string()],
            }
        }
    }
}

async fn execute<R>(
    registry: &Registry,
    reader: &R,
    inputs: &TaskInputs,
    context: &TaskContext,
) -> Result<Intent, InvestError>
where
    R: ChainReader + ?Sized,
{
    // An unsupported chain is reported even when the context is also bad.
    ChainId::try_from(inputs.chain_id)?;
    let settler = context.settler_for(inputs.chain_id)?;
    let request = InvestRequest {
        chain_id: inputs.chain_id,
        token: &inputs.token,
        amount: &inputs.amount,
        max_fee: &inputs.max_fee,
        user: context.user,
        settler,
    };
    build_invest_intent(registry, reader, &request).await
}
