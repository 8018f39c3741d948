//! Shared types for the invest intent pipeline: chains, calls, intents, and external reads.

pub mod chain;
pub mod intent;
pub mod reads;
pub mod serde_helpers;

pub use chain::{ChainId, UnsupportedChainId};
pub use intent::{Call, Intent, OpType, TokenAmount};
pub use reads::{CallQuery, ChainReader, ReadError};
