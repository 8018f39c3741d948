use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::{chain::ChainId, serde_helpers::u256_decimal};

/// Operation kind of an intent. The invest task only emits batched EVM calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpType {
    EvmCall,
}

/// A single low-level contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    /// Native value attached to the call (always zero for token supplies).
    #[serde(with = "u256_decimal")]
    pub value: U256,
    pub data: Bytes,
}

impl Call {
    /// A call that carries no native value.
    pub fn new(target: Address, data: Bytes) -> Self {
        Self {
            target,
            value: U256::ZERO,
            data,
        }
    }
}

/// Token quantity in base units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: Address,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
}

/// Chain-scoped bundle of ordered calls plus the fee budget the settler may charge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub op: OpType,
    pub chain_id: ChainId,
    pub user: Address,
    /// Address designated to relay the calls on behalf of `user`.
    pub settler: Address,
    /// Ordered: an approval always precedes the call it authorises.
    pub calls: Vec<Call>,
    pub max_fees: Vec<TokenAmount>,
}
