//! Intent assembly.

use core::str::FromStr;

use alloy_primitives::{Address, Bytes};
use invest_intent_types::{Call, ChainId, ChainReader, Intent, OpType, TokenAmount};

use crate::{
    amount::normalize,
    encoder::{encode_approve, encode_supply, REFERRAL_CODE},
    errors::InvestError,
    registry::{Registry, Token},
};

/// Accumulates calls and fees for one chain, then validates the result.
#[derive(Clone, Debug)]
pub struct IntentBuilder {
    chain: ChainId,
    user: Option<Address>,
    settler: Option<Address>,
    calls: Vec<Call>,
    max_fees: Vec<TokenAmount>,
}

impl IntentBuilder {
    pub fn for_chain(chain: ChainId) -> Self {
        Self {
            chain,
            user: None,
            settler: None,
            calls: Vec::new(),
            max_fees: Vec::new(),
        }
    }

    pub fn with_user(mut self, user: Address) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_settler(mut self, settler: Address) -> Self {
        self.settler = Some(settler);
        self
    }

    /// Append a zero-value call. Calls execute in insertion order.
    pub fn add_call(mut self, target: Address, data: Bytes) -> Self {
        self.calls.push(Call::new(target, data));
        self
    }

    pub fn add_max_fee(mut self, fee: TokenAmount) -> Self {
        self.max_fees.push(fee);
        self
    }

    pub fn build(self) -> Result<Intent, InvestError> {
        let user = self.user.ok_or(InvestError::InvalidIntent("missing user"))?;
        let settler = self.settler.ok_or(InvestError::InvalidIntent("missing settler"))?;
        if self.calls.is_empty() {
            return Err(InvestError::InvalidIntent("intent has no calls"));
        }
        for (i, fee) in self.max_fees.iter().enumerate() {
            if self.max_fees[..i].iter().any(|f| f.token == fee.token) {
                return Err(InvestError::InvalidIntent("duplicate max fee token"));
            }
        }

        Ok(Intent {
            op: OpType::EvmCall,
            chain_id: self.chain,
            user,
            settler,
            calls: self.calls,
            max_fees: self.max_fees,
        })
    }
}

/// Token given either as a `0x` address or as a registry symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenRef<'a> {
    Address(Address),
    Symbol(&'a str),
}

impl<'a> TokenRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"));
        match digits.map(Address::from_str) {
            Some(Ok(address)) => TokenRef::Address(address),
            _ => TokenRef::Symbol(value),
        }
    }
}

/// Raw inputs of one invest build.
#[derive(Clone, Debug)]
pub struct InvestRequest<'a> {
    pub chain_id: u64,
    pub token: &'a str,
    pub amount: &'a str,
    pub max_fee: &'a str,
    pub user: Address,
    pub settler: Address,
}

/// Build the `approve` + `supply` intent for `request`.
///
/// Every resolution (chain, token decimals, amounts, pool) happens before any
/// call is encoded, so a failure leaves nothing behind.
pub async fn build_invest_intent<R>(
    registry: &Registry,
    reader: &R,
    request: &InvestRequest<'_>,
) -> Result<Intent, InvestError>
where
    R: ChainReader + ?Sized,
{
    let chain = ChainId::try_from(request.chain_id)?;

    let token = resolve_token(registry, reader, chain, request.token).await?;

    // The fee is charged in the invested token, so both use its precision.
    let amount = normalize(request.amount, token.decimals)?;
    let max_fee = normalize(request.max_fee, token.decimals)?;

    let pool = registry.resolve_pool(request.chain_id)?;

    let intent = IntentBuilder::for_chain(chain)
        .with_user(request.user)
        .with_settler(request.settler)
        .add_call(token.address, encode_approve(pool, amount))
        .add_call(pool, encode_supply(token.address, amount, request.user, REFERRAL_CODE))
        .add_max_fee(TokenAmount {
            token: token.address,
            amount: max_fee,
        })
        .build()?;

    tracing::info!(
        chain = chain.id(),
        token = %token.address,
        %amount,
        %max_fee,
        "built invest intent"
    );
    Ok(intent)
}

async fn resolve_token<R>(
    registry: &Registry,
    reader: &R,
    chain: ChainId,
    token: &str,
) -> Result<Token, InvestError>
where
    R: ChainReader + ?Sized,
{
    match TokenRef::parse(token) {
        TokenRef::Symbol(symbol) => registry.resolve_token(chain, symbol),
        TokenRef::Address(address) => {
            let decimals = reader.decimals(chain, address).await?;
            Ok(Token {
                chain,
                address,
                decimals,
                symbol: registry.find_token(chain, address).and_then(|t| t.symbol),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};

    const TOKEN: Address = address!("0b2c639c533813f4aa9d7837caf62653d097ff85");
    const USER: Address = address!("1111111111111111111111111111111111111111");

    #[test]
    fn token_refs() {
        assert_eq!(
            TokenRef::parse("0x0b2c639c533813f4aa9d7837caf62653d097ff85"),
            TokenRef::Address(TOKEN)
        );
        assert_eq!(TokenRef::parse("USDC"), TokenRef::Symbol("USDC"));
        assert_eq!(
            TokenRef::parse("0X0B2C639C533813F4AA9D7837CAF62653D097FF85"),
            TokenRef::Address(TOKEN)
        );
        assert_eq!(TokenRef::parse("0xnothex"), TokenRef::Symbol("0xnothex"));
    }

    #[test]
    fn builder_requires_calls_and_parties() {
        let err = IntentBuilder::for_chain(ChainId::Base)
            .with_user(USER)
            .with_settler(USER)
            .build()
            .unwrap_err();
        assert_eq!(err, InvestError::InvalidIntent("intent has no calls"));

        let err = IntentBuilder::for_chain(ChainId::Base)
            .add_call(TOKEN, Bytes::new())
            .with_settler(USER)
            .build()
            .unwrap_err();
        assert_eq!(err, InvestError::InvalidIntent("missing user"));
    }

    #[test]
    fn builder_rejects_duplicate_fee_tokens() {
        let fee = TokenAmount {
            token: TOKEN,
            amount: U256::from(1u64),
        };
        let err = IntentBuilder::for_chain(ChainId::Base)
            .with_user(USER)
            .with_settler(USER)
            .add_call(TOKEN, Bytes::new())
            .add_max_fee(fee.clone())
            .add_max_fee(fee)
            .build()
            .unwrap_err();
        assert_eq!(err, InvestError::InvalidIntent("duplicate max fee token"));
    }

    #[test]
    fn builder_preserves_call_order() {
        let intent = IntentBuilder::for_chain(ChainId::Arbitrum)
            .with_user(USER)
            .with_settler(USER)
            .add_call(TOKEN, Bytes::from_static(&[1]))
            .add_call(USER, Bytes::from_static(&[2]))
            .build()
            .unwrap();
        assert_eq!(intent.calls[0].target, TOKEN);
        assert_eq!(intent.calls[1].target, USER);
        assert!(intent.calls.iter().all(|c| c.value.is_zero()));
    }
}
