//! Signing capability and the local-key implementation

use crate::error::SignerError;

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest};
use std::fmt;
use std::str::FromStr;

/// 32-byte secp256k1 secret
///
/// Has no `Display`; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for PrivateKey {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_str)
            .map_err(|e| SignerError::InvalidKey(format!("not hex: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            SignerError::InvalidKey(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Derives addresses and produces signed raw transactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Public address controlled by `key`
    fn derive_address(&self, key: &PrivateKey) -> Result<Address, SignerError>;

    /// Sign `tx` and return its serialized encoding, ready for `eth_sendRawTransaction`
    async fn sign_and_serialize(
        &self,
        key: &PrivateKey,
        tx: &TransactionRequest,
    ) -> Result<Bytes, SignerError>;
}

/// Signs legacy transactions with an in-memory key
///
/// A chain id of 0 (or none) produces a pre-EIP-155 signature with `v` in
/// {27, 28}; any other chain id is folded into `v` per EIP-155.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSigner;

impl LocalSigner {
    pub fn new() -> Self {
        Self
    }

    fn wallet(key: &PrivateKey) -> Result<LocalWallet, SignerError> {
        LocalWallet::from_bytes(key.as_bytes())
            .map_err(|e| SignerError::InvalidKey(e.to_string()))
    }
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    fn derive_address(&self, key: &PrivateKey) -> Result<Address, SignerError> {
        Ok(Self::wallet(key)?.address())
    }

    async fn sign_and_serialize(
        &self,
        key: &PrivateKey,
        tx: &TransactionRequest,
    ) -> Result<Bytes, SignerError> {
        let wallet = Self::wallet(key)?;
        let chain_id = tx.chain_id.map(|id| id.as_u64()).unwrap_or(0);

        let mut request = tx.clone();
        if chain_id == 0 {
            request.chain_id = None;
            let typed = TypedTransaction::Legacy(request);
            let signature = wallet
                .sign_hash(typed.sighash())
                .map_err(|e| SignerError::Signing(e.to_string()))?;
            return Ok(typed.rlp_signed(&signature));
        }

        let typed = TypedTransaction::Legacy(request);
        let signature = wallet
            .with_chain_id(chain_id)
            .sign_transaction_sync(&typed)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(typed.rlp_signed(&signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Transaction, U256};
    use ethers::utils::rlp;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn key() -> PrivateKey {
        KEY.parse().unwrap()
    }

    fn request(chain_id: u64) -> TransactionRequest {
        TransactionRequest::new()
            .to("0x3535353535353535353535353535353535353535".parse::<Address>().unwrap())
            .value(U256::from(1_000_000_000u64))
            .gas(21_000u64)
            .gas_price(20_000_000_000u64)
            .nonce(9u64)
            .chain_id(chain_id)
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let with = key();
        let without: PrivateKey = KEY.trim_start_matches("0x").parse().unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_rejects_wrong_length_and_non_hex() {
        assert!(matches!(
            "0x1234".parse::<PrivateKey>(),
            Err(SignerError::InvalidKey(_))
        ));
        assert!(matches!(
            "zz".repeat(32).parse::<PrivateKey>(),
            Err(SignerError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let printed = format!("{:?}", key());
        assert_eq!(printed, "PrivateKey(<redacted>)");
        assert!(!printed.contains("4c0883"));
    }

    #[test]
    fn test_derive_known_address() {
        let address = LocalSigner::new().derive_address(&key()).unwrap();
        let expected: Address = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23".parse().unwrap();
        assert_eq!(address, expected);
    }

    #[test]
    fn test_zero_key_is_invalid() {
        let zero = PrivateKey::from_bytes([0u8; 32]);
        assert!(matches!(
            LocalSigner::new().derive_address(&zero),
            Err(SignerError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let signer = LocalSigner::new();
        let a = signer.sign_and_serialize(&key(), &request(1337)).await.unwrap();
        let b = signer.sign_and_serialize(&key(), &request(1337)).await.unwrap();
        assert_eq!(a, b);

        let other_nonce = request(1337).nonce(10u64);
        let c = signer.sign_and_serialize(&key(), &other_nonce).await.unwrap();
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_eip155_signature_recovers_sender() {
        let signer = LocalSigner::new();
        let raw = signer.sign_and_serialize(&key(), &request(1337)).await.unwrap();

        let decoded: Transaction = rlp::decode(raw.as_ref()).unwrap();
        assert_eq!(decoded.nonce, U256::from(9u64));
        let v = decoded.v.as_u64();
        assert!(v == 1337 * 2 + 35 || v == 1337 * 2 + 36);
        assert_eq!(
            decoded.recover_from().unwrap(),
            signer.derive_address(&key()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_chain_id_zero_uses_pre_eip155_signature() {
        let signer = LocalSigner::new();
        let raw = signer.sign_and_serialize(&key(), &request(0)).await.unwrap();

        let decoded: Transaction = rlp::decode(raw.as_ref()).unwrap();
        assert!(decoded.v.as_u64() == 27 || decoded.v.as_u64() == 28);
        assert_eq!(
            decoded.recover_from().unwrap(),
            signer.derive_address(&key()).unwrap()
        );
    }
}
