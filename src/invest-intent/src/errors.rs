use alloy_primitives::Address;
use invest_intent_types::{ChainId, ReadError, UnsupportedChainId};
use thiserror::Error;

use crate::plan::{BackendError, SignerError};

/// Errors that abort an intent build. No partial intent is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvestError {
    #[error("Invalid chain {0}")]
    UnsupportedChain(u64),

    #[error("Invalid amount {value:?}: {reason}")]
    InvalidAmount { value: String, reason: &'static str },

    #[error("Unknown token {symbol} on {chain}")]
    UnknownToken { chain: ChainId, symbol: String },

    #[error("External read failed: {0}")]
    ExternalRead(#[from] ReadError),

    #[error("Invalid task context: {0}")]
    InvalidContext(String),

    #[error("Invalid intent: {0}")]
    InvalidIntent(&'static str),

    #[error("Registry has no lending pool for {0}")]
    RegistryIncomplete(ChainId),
}

impl From<UnsupportedChainId> for InvestError {
    fn from(err: UnsupportedChainId) -> Self {
        InvestError::UnsupportedChain(err.0)
    }
}

impl InvestError {
    pub(crate) fn invalid_amount(value: &str, reason: &'static str) -> Self {
        InvestError::InvalidAmount {
            value: value.to_string(),
            reason,
        }
    }
}

/// Errors surfaced by the recurring-plan controller.
///
/// Validation failures are raised before the backend is contacted; plan state
/// is left unchanged on every error.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid amount {0:?}: enter a positive amount to invest")]
    InvalidAmount(String),

    #[error("Invalid max fee {0:?}: enter a positive max fee")]
    InvalidMaxFee(String),

    #[error("Invalid chain {0}")]
    UnsupportedChain(u64),

    #[error("{0} is not an EIP-7702 delegated account")]
    NotSmartAccount(Address),

    #[error("Could not check account delegation: {0}")]
    AccountCheck(#[from] ReadError),

    #[error("Signature rejected: {0}")]
    SignatureRejected(#[from] SignerError),

    #[error("Submission failed: {0}")]
    SubmissionFailure(BackendError),

    #[error("Failed to look up current plan: {0}")]
    Lookup(BackendError),

    #[error("A savings plan is already active")]
    PlanAlreadyActive,

    #[error("No active savings plan")]
    NoActivePlan,

    #[error("Controller is busy {0}")]
    Busy(&'static str),
}

impl From<UnsupportedChainId> for PlanError {
    fn from(err: UnsupportedChainId) -> Self {
        PlanError::UnsupportedChain(err.0)
    }
}
