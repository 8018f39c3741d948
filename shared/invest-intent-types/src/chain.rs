use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Networks the invest task can target.
///
/// Serialized as the bare EVM chain id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u64", try_from = "u64")]
#[repr(u64)]
pub enum ChainId {
    Ethereum = 1,
    Optimism = 10,
    Base = 8453,
    Arbitrum = 42161,
}

/// A raw chain id outside the supported set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("Invalid chain {0}")]
pub struct UnsupportedChainId(pub u64);

impl ChainId {
    pub const ALL: [ChainId; 4] = [
        ChainId::Ethereum,
        ChainId::Optimism,
        ChainId::Base,
        ChainId::Arbitrum,
    ];

    pub const fn id(self) -> u64 {
        self as u64
    }

    /// Lowercase network key used by token tables and config files.
    pub const fn key(self) -> &'static str {
        match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Optimism => "optimism",
            ChainId::Base => "base",
            ChainId::Arbitrum => "arbitrum",
        }
    }
}

impl TryFrom<u64> for ChainId {
    type Error = UnsupportedChainId;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        use ChainId::*;
        let chain = match value {
            1 => Ethereum,
            10 => Optimism,
            8453 => Base,
            42161 => Arbitrum,
            other => return Err(UnsupportedChainId(other)),
        };
        Ok(chain)
    }
}

impl From<ChainId> for u64 {
    fn from(chain: ChainId) -> Self {
        chain.id()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key(), self.id())
    }
}
