use alloy_primitives::{Address, Bytes, Selector};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ChainId;

/// Errors during external chain reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Used by mocks or partially implemented readers.
    #[error("read not implemented by this provider")]
    NotImplemented,
    /// No response is available for the request.
    #[error("no response for call to {to} (selector {selector}) on chain {chain_id}")]
    MissingResponse {
        chain_id: u64,
        to: Address,
        selector: Selector,
    },
    /// The underlying call failed.
    #[error("call to {to} on chain {chain_id} failed: {reason}")]
    CallFailed {
        chain_id: u64,
        to: Address,
        reason: String,
    },
    /// Return data was malformed or could not be decoded.
    #[error("malformed return data: {0}")]
    MalformedReturn(String),
}

/// A read-only contract call request, identified by target and selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallQuery {
    pub chain_id: u64,
    pub to: Address,
    pub fn_selector: Selector,
}

/// Source of on-chain facts, implemented differently by runners and tests.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// ERC-20 `decimals()` of `token`.
    async fn decimals(&self, _chain: ChainId, _token: Address) -> Result<u8, ReadError> {
        Err(ReadError::NotImplemented)
    }

    /// Deployed code at `account` (empty for plain EOAs).
    async fn code_at(&self, _chain: ChainId, _account: Address) -> Result<Bytes, ReadError> {
        Err(ReadError::NotImplemented)
    }
}
