//! Mock chain reader for runners and tests.

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use invest_intent_types::{CallQuery, ChainId, ChainReader, ReadError};
use serde::{Deserialize, Serialize};

use crate::encoder::decimals_query;

/// Canned response for a read-only call, e.g. `{ "value": "6", "abiType": "uint8" }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub value: String,
    pub abi_type: String,
}

/// A request/response pair served by [`MockChainReader`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMock {
    pub request: CallQuery,
    pub response: CallResponse,
}

/// Serves reads from canned call responses and account code.
///
/// Unknown accounts have empty code.
#[derive(Clone, Debug, Default)]
pub struct MockChainReader {
    calls: HashMap<CallQuery, CallResponse>,
    codes: HashMap<(ChainId, Address), Bytes>,
}

impl MockChainReader {
    pub fn new(calls: impl IntoIterator<Item = CallMock>) -> Self {
        Self {
            calls: calls.into_iter().map(|m| (m.request, m.response)).collect(),
            codes: HashMap::new(),
        }
    }

    pub fn with_decimals(mut self, chain: ChainId, token: Address, decimals: u8) -> Self {
        self.calls.insert(
            decimals_query(chain, token),
            CallResponse {
                value: decimals.to_string(),
                abi_type: "uint8".to_string(),
            },
        );
        self
    }

    pub fn with_code(mut self, chain: ChainId, account: Address, code: Bytes) -> Self {
        self.codes.insert((chain, account), code);
        self
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn decimals(&self, chain: ChainId, token: Address) -> Result<u8, ReadError> {
        let query = decimals_query(chain, token);
        let response = self.calls.get(&query).ok_or(ReadError::MissingResponse {
            chain_id: query.chain_id,
            to: query.to,
            selector: query.fn_selector,
        })?;
        if response.abi_type != "uint8" {
            return Err(ReadError::MalformedReturn(format!(
                "expected uint8, got {}",
                response.abi_type
            )));
        }
        response
            .value
            .parse::<u8>()
            .map_err(|e| ReadError::MalformedReturn(format!("{:?}: {e}", response.value)))
    }

    async fn code_at(&self, chain: ChainId, account: Address) -> Result<Bytes, ReadError> {
        Ok(self.codes.get(&(chain, account)).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TOKEN: Address = address!("0b2c639c533813f4aa9d7837caf62653d097ff85");

    #[tokio::test]
    async fn serves_configured_decimals() {
        let reader = MockChainReader::default().with_decimals(ChainId::Optimism, TOKEN, 6);
        assert_eq!(reader.decimals(ChainId::Optimism, TOKEN).await, Ok(6));
    }

    #[tokio::test]
    async fn missing_response_is_an_error() {
        let reader = MockChainReader::default().with_decimals(ChainId::Optimism, TOKEN, 6);
        let err = reader.decimals(ChainId::Base, TOKEN).await.unwrap_err();
        assert!(matches!(err, ReadError::MissingResponse { chain_id: 8453, .. }));
    }

    #[tokio::test]
    async fn parses_call_mocks_from_json() {
        let json = r#"[{
            "request": { "chainId": 10, "to": "0x0b2c639c533813f4aa9d7837caf62653d097ff85", "fnSelector": "0x313ce567" },
            "response": { "value": "18", "abiType": "uint8" }
        }]"#;
        let mocks: Vec<CallMock> = serde_json::from_str(json).unwrap();
        let reader = MockChainReader::new(mocks);
        assert_eq!(reader.decimals(ChainId::Optimism, TOKEN).await, Ok(18));
    }

    #[tokio::test]
    async fn rejects_non_uint8_responses() {
        let reader = MockChainReader::new([CallMock {
            request: decimals_query(ChainId::Optimism, TOKEN),
            response: CallResponse {
                value: "300".into(),
                abi_type: "uint8".into(),
            },
        }]);
        assert!(matches!(
            reader.decimals(ChainId::Optimism, TOKEN).await,
            Err(ReadError::MalformedReturn(_))
        ));
    }
}
