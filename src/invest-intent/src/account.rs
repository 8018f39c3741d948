//! EIP-7702 delegation detection.
//!
//! A delegated EOA carries the 23-byte designator `0xef0100 || target` as its
//! code. Recurring plans can only be executed for such accounts.

use alloy_primitives::Address;
use async_trait::async_trait;
use invest_intent_types::{ChainId, ChainReader, ReadError};

pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Delegate contract encoded in `code`, if it is an EIP-7702 designator.
pub fn delegation_target(code: &[u8]) -> Option<Address> {
    if code.len() != DELEGATION_PREFIX.len() + 20 || !code.starts_with(&DELEGATION_PREFIX) {
        return None;
    }
    Some(Address::from_slice(&code[DELEGATION_PREFIX.len()..]))
}

/// Reports whether an address is a delegated / smart account.
#[async_trait]
pub trait AccountInspector: Send + Sync {
    async fn is_smart_account(&self, chain: ChainId, account: Address) -> Result<bool, ReadError>;
}

/// [`AccountInspector`] that reads account code through a [`ChainReader`].
pub struct DelegationInspector<R> {
    reader: R,
}

impl<R: ChainReader> DelegationInspector<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R: ChainReader> AccountInspector for DelegationInspector<R> {
    async fn is_smart_account(&self, chain: ChainId, account: Address) -> Result<bool, ReadError> {
        let code = self.reader.code_at(chain, account).await?;
        let target = delegation_target(&code);
        tracing::debug!(chain = chain.id(), %account, delegated = target.is_some(), "checked delegation");
        Ok(target.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::MockChainReader;
    use alloy_primitives::{address, Bytes};

    const EOA: Address = address!("2222222222222222222222222222222222222222");
    const DELEGATE: Address = address!("63c0c19a282a1B52b07dD5a65b58948A07DAE32B");

    fn designator(target: Address) -> Bytes {
        let mut code = DELEGATION_PREFIX.to_vec();
        code.extend_from_slice(target.as_slice());
        code.into()
    }

    #[test]
    fn decodes_designator() {
        assert_eq!(delegation_target(&designator(DELEGATE)), Some(DELEGATE));
        assert_eq!(delegation_target(&[]), None);
        // Regular contract code is not a delegation.
        assert_eq!(delegation_target(&[0x60, 0x80, 0x60, 0x40]), None);
        let mut long = designator(DELEGATE).to_vec();
        long.push(0);
        assert_eq!(delegation_target(&long), None);
    }

    #[tokio::test]
    async fn inspects_code_through_reader() {
        let reader = MockChainReader::default().with_code(ChainId::Base, EOA, designator(DELEGATE));
        let inspector = DelegationInspector::new(reader);
        assert!(inspector.is_smart_account(ChainId::Base, EOA).await.unwrap());
        assert!(!inspector.is_smart_account(ChainId::Optimism, EOA).await.unwrap());
    }
}
