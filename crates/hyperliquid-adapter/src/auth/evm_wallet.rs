/*
[INPUT]:  EVM private key (hex string) or a freshly generated key
[OUTPUT]: Signed EIP-712 hashes and wallet address
[POS]:    Auth layer - secp256k1 wallet implementation
[UPDATE]: When signing logic or key handling changes
*/

use std::str::FromStr;

use alloy_primitives::{Address, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use crate::auth::wallet::{ActionSignature, WalletSigner};
use crate::http::{HyperliquidError, Result};

/// Signer backed by a local secp256k1 private key
#[derive(Clone)]
pub struct EvmWalletSigner {
    signer: PrivateKeySigner,
}

impl EvmWalletSigner {
    /// Create a new EVM wallet signer from a hex-encoded private key
    ///
    /// Supports both "0x"-prefixed and non-prefixed hex strings.
    pub fn new(private_key_hex: &str) -> Result<Self> {
        let private_key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);
        let signer = PrivateKeySigner::from_str(private_key_hex)
            .map_err(|e| HyperliquidError::Config(format!("Invalid EVM private key: {e}")))?;
        Ok(Self { signer })
    }

    /// Generate a random key, used for agent wallets
    pub fn random() -> Result<Self> {
        let bytes = B256::from(rand::random::<[u8; 32]>());
        let signer = PrivateKeySigner::from_bytes(&bytes)
            .map_err(|e| HyperliquidError::Signing(format!("failed to generate key: {e}")))?;
        Ok(Self { signer })
    }

    /// Hex-encoded private key (`0x` + 64 hex digits)
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signer.to_bytes()))
    }
}

impl std::fmt::Debug for EvmWalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWalletSigner")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletSigner for EvmWalletSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_hash(&self, hash: B256) -> Result<ActionSignature> {
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|e| HyperliquidError::Signing(format!("failed to sign hash: {e}")))?;
        Ok(ActionSignature::from_alloy(&signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_evm_wallet_signer() {
        let signer = EvmWalletSigner::new(TEST_KEY).unwrap();
        assert_eq!(
            signer.address().to_checksum(None),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        let hash = alloy_primitives::keccak256(b"hello");
        let signature = signer.sign_hash(hash).await.unwrap();
        assert!(signature.v == 27 || signature.v == 28);

        let recovered = signature
            .to_alloy()
            .recover_address_from_prehash(&hash)
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_evm_wallet_signer_no_prefix() {
        let pk = TEST_KEY.trim_start_matches("0x");
        let signer = EvmWalletSigner::new(pk).unwrap();
        assert_eq!(signer.private_key_hex(), TEST_KEY);
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(EvmWalletSigner::new("0x1234").is_err());
    }

    #[test]
    fn test_random_keys_differ() {
        let a = EvmWalletSigner::random().unwrap();
        let b = EvmWalletSigner::random().unwrap();
        assert_ne!(a.address(), b.address());
    }
}
