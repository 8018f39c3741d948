use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use super::{
    schedule::Frequency,
    signer::{keccak256_bytes, recover_signer, signature_from_hex, SignerError},
};

/// Cron trigger of a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub schedule: String,
}

impl Trigger {
    pub fn cron(frequency: Frequency) -> Self {
        Self {
            schedule: frequency.schedule().to_string(),
        }
    }
}

/// Raw task inputs replayed on every trigger. Amounts stay as entered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
    pub chain_id: u64,
    pub token: Address,
    pub amount: String,
    pub max_fee: String,
}

/// A signed recurring-plan configuration as stored by the scheduling backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPlanConfig {
    /// Owner signature (`0x` hex, r||s||v) over [`RecurringPlanConfig::digest`].
    /// Doubles as the plan identifier.
    pub sig: String,
    pub signer: Address,
    pub trigger: Trigger,
    pub input: PlanInput,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

impl RecurringPlanConfig {
    pub fn frequency(&self) -> Option<Frequency> {
        Frequency::from_schedule(&self.trigger.schedule)
    }

    pub fn digest(&self) -> B256 {
        plan_digest(self.signer, &self.trigger, &self.input, self.created_at)
    }

    /// Check that `sig` was produced by `signer`.
    pub fn verify(&self) -> Result<(), SignerError> {
        let signature = signature_from_hex(&self.sig)?;
        ensure_signer(self.digest(), &signature, self.signer)
    }

    /// Check a cancellation signature against the plan owner.
    pub fn verify_cancellation(&self, signature: &str) -> Result<(), SignerError> {
        let signature = signature_from_hex(signature)?;
        ensure_signer(cancellation_digest(self.digest()), &signature, self.signer)
    }
}

fn ensure_signer(digest: B256, signature: &[u8], expected: Address) -> Result<(), SignerError> {
    let recovered = recover_signer(digest, signature)?;
    if recovered != expected {
        return Err(SignerError::Mismatch { expected, recovered });
    }
    Ok(())
}

fn pad_address(address: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    padded
}

fn domain_separator(chain_id: u64) -> B256 {
    let domain_type_hash = keccak256_bytes(b"EIP712Domain(string name,string version,uint256 chainId)");
    let domain_name_hash = keccak256_bytes(b"Aave Invest Plan");
    let domain_version_hash = keccak256_bytes(b"1");

    let mut domain_buf = Vec::with_capacity(32 * 4);
    domain_buf.extend_from_slice(domain_type_hash.as_slice());
    domain_buf.extend_from_slice(domain_name_hash.as_slice());
    domain_buf.extend_from_slice(domain_version_hash.as_slice());
    domain_buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    keccak256_bytes(&domain_buf)
}

fn typed_digest(chain_id: u64, struct_hash: B256) -> B256 {
    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator(chain_id).as_slice());
    final_buf.extend_from_slice(struct_hash.as_slice());
    keccak256_bytes(&final_buf)
}

/// EIP-712 digest the plan owner signs on activation.
pub fn plan_digest(signer: Address, trigger: &Trigger, input: &PlanInput, created_at: u64) -> B256 {
    let msg_type_hash = keccak256_bytes(
        b"RecurringPlan(address signer,string schedule,uint256 chainId,address token,string amount,string maxFee,uint64 createdAt)",
    );

    let mut struct_buf = Vec::with_capacity(32 * 8);
    struct_buf.extend_from_slice(msg_type_hash.as_slice());
    struct_buf.extend_from_slice(&pad_address(signer));
    struct_buf.extend_from_slice(keccak256_bytes(trigger.schedule.as_bytes()).as_slice());
    struct_buf.extend_from_slice(&U256::from(input.chain_id).to_be_bytes::<32>());
    struct_buf.extend_from_slice(&pad_address(input.token));
    struct_buf.extend_from_slice(keccak256_bytes(input.amount.as_bytes()).as_slice());
    struct_buf.extend_from_slice(keccak256_bytes(input.max_fee.as_bytes()).as_slice());
    let mut created_padded = [0u8; 32];
    created_padded[24..32].copy_from_slice(&created_at.to_be_bytes());
    struct_buf.extend_from_slice(&created_padded);

    typed_digest(input.chain_id, keccak256_bytes(&struct_buf))
}

/// EIP-712 digest the plan owner signs to cancel the plan with `plan_digest`.
pub fn cancellation_digest(plan_digest: B256) -> B256 {
    let msg_type_hash = keccak256_bytes(b"CancelPlan(bytes32 plan)");
    let mut struct_buf = Vec::with_capacity(32 * 2);
    struct_buf.extend_from_slice(msg_type_hash.as_slice());
    struct_buf.extend_from_slice(plan_digest.as_slice());
    // Cancellations are chain-agnostic.
    typed_digest(0, keccak256_bytes(&struct_buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn input() -> PlanInput {
        PlanInput {
            chain_id: 8453,
            token: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            amount: "25".into(),
            max_fee: "0.1".into(),
        }
    }

    #[test]
    fn digest_binds_every_field() {
        let signer = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let trigger = Trigger::cron(Frequency::Daily);
        let base = plan_digest(signer, &trigger, &input(), 1);

        assert_eq!(base, plan_digest(signer, &trigger, &input(), 1));
        assert_ne!(base, plan_digest(signer, &trigger, &input(), 2));
        assert_ne!(base, plan_digest(Address::ZERO, &trigger, &input(), 1));
        assert_ne!(base, plan_digest(signer, &Trigger::cron(Frequency::Weekly), &input(), 1));

        let mut other = input();
        other.max_fee = "0.2".into();
        assert_ne!(base, plan_digest(signer, &trigger, &other, 1));

        let mut other = input();
        other.chain_id = 10;
        assert_ne!(base, plan_digest(signer, &trigger, &other, 1));

        assert_ne!(base, cancellation_digest(base));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let config = RecurringPlanConfig {
            sig: "0x00".into(),
            signer: Address::ZERO,
            trigger: Trigger::cron(Frequency::Monthly),
            input: input(),
            created_at: 7,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["trigger"]["schedule"], "0 0 1 * *");
        assert_eq!(json["input"]["maxFee"], "0.1");
        assert_eq!(json["input"]["chainId"], 8453);
        assert_eq!(json["createdAt"], 7);
        assert_eq!(config.frequency(), Some(Frequency::Monthly));
    }
}
