//! Fixed chain and token tables.
//!
//! The lending-pool table is checked for completeness against
//! [`ChainId::ALL`] when a [`Registry`] is loaded, so a missing entry fails at
//! start-up instead of on the first build for that chain.

use std::collections::BTreeMap;

use alloy_primitives::{address, Address};
use invest_intent_types::ChainId;

use crate::errors::InvestError;

/// Aave v3 `Pool` proxies.
pub const AAVE_V3_POOLS: [(ChainId, Address); 4] = [
    (ChainId::Ethereum, address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2")),
    (ChainId::Arbitrum, address!("794a61358d6845594f94dc1db02a252b5b4814ad")),
    (ChainId::Base, address!("a238dd80c259a72e81d7e4664a9801593f98d1c5")),
    (ChainId::Optimism, address!("794a61358d6845594f94dc1db02a252b5b4814ad")),
];

/// Tokens offered by the plan form, in display order per chain.
pub const TOKENS: [(ChainId, &str, Address, u8); 6] = [
    (ChainId::Arbitrum, "USDC", address!("af88d065e77c8cC2239327C5EDb3A432268e5831"), 6),
    (ChainId::Arbitrum, "USDT", address!("fd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9"), 6),
    (ChainId::Base, "USDC", address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), 6),
    (ChainId::Base, "USDT", address!("fde4c96c8593536e31f229ea8f37b2ada2699bb2"), 6),
    (ChainId::Optimism, "USDC", address!("0b2c639c533813f4aa9d7837caf62653d097ff85"), 6),
    (ChainId::Optimism, "USDT", address!("94b008aa00579c1307b0ef2c499ad98a8ce58e58"), 6),
];

/// A resolved ERC-20 token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub chain: ChainId,
    pub address: Address,
    pub decimals: u8,
    /// Known only for registry tokens.
    pub symbol: Option<&'static str>,
}

/// Immutable view over the pool and token tables.
#[derive(Clone, Debug)]
pub struct Registry {
    pools: BTreeMap<ChainId, Address>,
    tokens: Vec<Token>,
}

impl Registry {
    /// Load the built-in tables.
    pub fn load() -> Result<Self, InvestError> {
        Self::from_tables(&AAVE_V3_POOLS, &TOKENS)
    }

    pub fn from_tables(
        pools: &[(ChainId, Address)],
        tokens: &[(ChainId, &'static str, Address, u8)],
    ) -> Result<Self, InvestError> {
        let pools: BTreeMap<ChainId, Address> = pools.iter().copied().collect();
        if let Some(missing) = ChainId::ALL.into_iter().find(|c| !pools.contains_key(c)) {
            return Err(InvestError::RegistryIncomplete(missing));
        }

        let tokens = tokens
            .iter()
            .map(|&(chain, symbol, address, decimals)| Token {
                chain,
                address,
                decimals,
                symbol: Some(symbol),
            })
            .collect();

        tracing::debug!(pools = pools.len(), "registry loaded");
        Ok(Self { pools, tokens })
    }

    /// Lending pool for a raw chain id.
    pub fn resolve_pool(&self, chain_id: u64) -> Result<Address, InvestError> {
        let chain = ChainId::try_from(chain_id)?;
        self.pools
            .get(&chain)
            .copied()
            .ok_or(InvestError::RegistryIncomplete(chain))
    }

    /// Token by symbol (case-insensitive) on `chain`.
    pub fn resolve_token(&self, chain: ChainId, symbol: &str) -> Result<Token, InvestError> {
        self.tokens
            .iter()
            .find(|t| t.chain == chain && t.symbol.is_some_and(|s| s.eq_ignore_ascii_case(symbol)))
            .copied()
            .ok_or_else(|| InvestError::UnknownToken {
                chain,
                symbol: symbol.to_string(),
            })
    }

    /// Registry token at `address` on `chain`, if listed.
    pub fn find_token(&self, chain: ChainId, address: Address) -> Option<Token> {
        self.tokens
            .iter()
            .find(|t| t.chain == chain && t.address == address)
            .copied()
    }

    /// Tokens listed for `chain`; the first one is the form default.
    pub fn tokens_for(&self, chain: ChainId) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().filter(move |t| t.chain == chain).copied()
    }
}
