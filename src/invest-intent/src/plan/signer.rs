//! Plan signing and signer recovery (secp256k1, `r || s || v`).

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use k256::{
    ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The account holder declined the signature request.
    #[error("user declined to sign: {0}")]
    Declined(String),
    #[error("invalid private key")]
    InvalidKey,
    #[error("malformed signature: {0}")]
    Malformed(&'static str),
    #[error("signature recovers to {recovered}, expected {expected}")]
    Mismatch { expected: Address, recovered: Address },
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Signs plan digests on behalf of one account.
#[async_trait]
pub trait ConfigSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_digest(&self, digest: B256) -> Result<[u8; 65], SignerError>;
}

/// Signer backed by an in-process private key.
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    pub fn new(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    /// Parse a hex private key (with or without `0x`).
    pub fn from_hex(private_key: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
            .map_err(|_| SignerError::InvalidKey)?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self::new(key))
    }
}

#[async_trait]
impl ConfigSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: B256) -> Result<[u8; 65], SignerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| SignerError::Failed(e.to_string()))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(out)
    }
}

pub(crate) fn keccak256_bytes(bytes: &[u8]) -> B256 {
    let mut h = Keccak256::new();
    h.update(bytes);
    B256::from_slice(h.finalize().as_slice())
}

/// Ethereum address of a public key: last 20 bytes of keccak256(x || y).
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the signer of `digest`. Accepts `v` in {0, 1, 27, 28}.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, SignerError> {
    if signature.len() != 65 {
        return Err(SignerError::Malformed("expected 65 bytes"));
    }
    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return Err(SignerError::Malformed("invalid recovery byte")),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(SignerError::Malformed("invalid recovery byte"))?;
    let signature =
        Signature::from_slice(&signature[..64]).map_err(|_| SignerError::Malformed("invalid r/s"))?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| SignerError::Malformed("signature does not recover"))?;
    Ok(address_of(&key))
}

pub fn signature_to_hex(signature: &[u8; 65]) -> String {
    format!("0x{}", hex::encode(signature))
}

pub fn signature_from_hex(signature: &str) -> Result<Vec<u8>, SignerError> {
    hex::decode(signature.trim_start_matches("0x")).map_err(|_| SignerError::Malformed("not hex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    // Well-known development key (anvil account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_known_address() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        assert_eq!(
            signer.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(matches!(LocalSigner::from_hex("0x1234"), Err(SignerError::InvalidKey)));
        assert!(matches!(LocalSigner::from_hex("zz"), Err(SignerError::InvalidKey)));
    }

    #[tokio::test]
    async fn signatures_recover_to_signer() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        let digest = b256!("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8");
        let signature = signer.sign_digest(digest).await.unwrap();
        assert!(signature[64] == 27 || signature[64] == 28);
        assert_eq!(recover_signer(digest, &signature).unwrap(), signer.address());

        let hex = signature_to_hex(&signature);
        assert_eq!(signature_from_hex(&hex).unwrap(), signature.to_vec());
    }

    #[test]
    fn rejects_truncated_signature() {
        assert_eq!(
            recover_signer(B256::ZERO, &[0u8; 64]),
            Err(SignerError::Malformed("expected 65 bytes"))
        );
    }
}
