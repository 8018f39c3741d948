//! ABI encoding for the two contract calls of an invest intent.
//!
//! Selectors and argument order must match the deployed contracts byte for
//! byte; a mismatch only shows up as a failed call on-chain.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use invest_intent_types::{CallQuery, ChainId};

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }

    interface IPool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
    }
}

/// Aave referral code attached to every supply. Not user-configurable.
pub const REFERRAL_CODE: u16 = 0;

/// `approve(address,uint256)` calldata.
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// `supply(address,uint256,address,uint16)` calldata.
pub fn encode_supply(asset: Address, amount: U256, on_behalf_of: Address, referral_code: u16) -> Bytes {
    IPool::supplyCall {
        asset,
        amount,
        onBehalfOf: on_behalf_of,
        referralCode: referral_code,
    }
    .abi_encode()
    .into()
}

/// Read request for ERC-20 `decimals()` of `token`.
pub fn decimals_query(chain: ChainId, token: Address) -> CallQuery {
    CallQuery {
        chain_id: chain.id(),
        to: token,
        fn_selector: IERC20::decimalsCall::SELECTOR.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex};
    use ethers::{
        abi::{decode, encode, ParamType, Token as AbiToken},
        types::{H160, U256 as EthersU256},
        utils::id,
    };

    const POOL: Address = address!("794a61358d6845594f94dc1db02a252b5b4814ad");
    const TOKEN: Address = address!("0b2c639c533813f4aa9d7837caf62653d097ff85");
    const USER: Address = address!("1111111111111111111111111111111111111111");

    fn reference_call(signature: &str, args: &[AbiToken]) -> Vec<u8> {
        let mut out = id(signature).to_vec();
        out.extend(encode(args));
        out
    }

    fn h160(address: Address) -> AbiToken {
        AbiToken::Address(H160::from_slice(address.as_slice()))
    }

    #[test]
    fn selectors_match_contract_interfaces() {
        assert_eq!(IERC20::approveCall::SELECTOR, hex!("095ea7b3"));
        assert_eq!(IPool::supplyCall::SELECTOR, hex!("617ba037"));
        assert_eq!(IERC20::decimalsCall::SELECTOR, hex!("313ce567"));
    }

    #[test]
    fn approve_golden_vector() {
        let data = encode_approve(POOL, U256::from(15_200_000u64));
        let expected = hex!(
            "095ea7b3"
            "000000000000000000000000794a61358d6845594f94dc1db02a252b5b4814ad"
            "0000000000000000000000000000000000000000000000000000000000e7ef00"
        );
        assert_eq!(&data[..], expected.as_slice());
    }

    #[test]
    fn supply_golden_vector() {
        let data = encode_supply(TOKEN, U256::from(15_200_000u64), USER, REFERRAL_CODE);
        let expected = hex!(
            "617ba037"
            "0000000000000000000000000b2c639c533813f4aa9d7837caf62653d097ff85"
            "0000000000000000000000000000000000000000000000000000000000e7ef00"
            "0000000000000000000000001111111111111111111111111111111111111111"
            "0000000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(data.len(), 4 + 32 * 4);
        assert_eq!(&data[..], expected.as_slice());
    }

    #[test]
    fn matches_reference_encoder() -> eyre::Result<()> {
        let amount = U256::from(123_456_789_000_000u64);
        let reference_amount = AbiToken::Uint(EthersU256::from(123_456_789_000_000u64));

        let approve = encode_approve(POOL, amount);
        let expected = reference_call(
            "approve(address,uint256)",
            &[h160(POOL), reference_amount.clone()],
        );
        assert_eq!(approve.to_vec(), expected);

        let supply = encode_supply(TOKEN, amount, USER, 0);
        let expected = reference_call(
            "supply(address,uint256,address,uint16)",
            &[h160(TOKEN), reference_amount, h160(USER), AbiToken::Uint(EthersU256::zero())],
        );
        assert_eq!(supply.to_vec(), expected);

        let decoded = decode(
            &[ParamType::Address, ParamType::Uint(256), ParamType::Address, ParamType::Uint(16)],
            &supply[4..],
        )?;
        assert_eq!(decoded[2], h160(USER));
        Ok(())
    }

    #[test]
    fn decimals_query_targets_token() {
        let query = decimals_query(ChainId::Optimism, TOKEN);
        assert_eq!(query.chain_id, 10);
        assert_eq!(query.to, TOKEN);
        assert_eq!(query.fn_selector.as_slice(), &hex!("313ce567"));
    }
}
