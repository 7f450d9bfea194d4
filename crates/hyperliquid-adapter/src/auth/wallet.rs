/*
[INPUT]:  32-byte EIP-712 signing hash and a wallet key
[OUTPUT]: Recoverable secp256k1 signature in exchange wire form
[POS]:    Auth layer - wallet integration abstraction
[UPDATE]: When adding new wallet types or changing signature format
*/

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::Result;

/// Signature as posted to `/exchange`: `{"r":"0x…","s":"0x…","v":27|28}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSignature {
    #[serde(with = "hex_u256")]
    pub r: U256,
    #[serde(with = "hex_u256")]
    pub s: U256,
    pub v: u8,
}

impl ActionSignature {
    /// Build from an alloy signature (`v` = 27 + y-parity)
    pub fn from_alloy(signature: &alloy_primitives::Signature) -> Self {
        Self {
            r: signature.r(),
            s: signature.s(),
            v: 27 + u8::from(signature.v()),
        }
    }

    pub fn to_alloy(&self) -> alloy_primitives::Signature {
        alloy_primitives::Signature::new(self.r, self.s, self.v == 28)
    }
}

/// Trait for wallet signing operations
///
/// The trait is async to support hardware wallets and external signers.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Get the wallet address
    fn address(&self) -> Address;

    /// Sign a prehashed EIP-712 message
    async fn sign_hash(&self, hash: B256) -> Result<ActionSignature>;
}

/// Mock wallet signer for testing
#[derive(Debug, Clone)]
pub struct MockWalletSigner {
    address: Address,
    signature: ActionSignature,
}

impl MockWalletSigner {
    /// Create a new mock signer with predetermined signature
    pub fn new(address: Address, signature: ActionSignature) -> Self {
        Self { address, signature }
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, _hash: B256) -> Result<ActionSignature> {
        Ok(self.signature)
    }
}

mod hex_u256 {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let digits = raw.strip_prefix("0x").unwrap_or(&raw);
        U256::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_signer() {
        let signature = ActionSignature {
            r: U256::from(0xabcu64),
            s: U256::from(1u64),
            v: 27,
        };
        let signer = MockWalletSigner::new(Address::repeat_byte(0x11), signature);

        assert_eq!(signer.address(), Address::repeat_byte(0x11));
        let signed = signer.sign_hash(B256::ZERO).await.unwrap();
        assert_eq!(signed, signature);
    }

    #[test]
    fn test_signature_wire_format() {
        let signature = ActionSignature {
            r: U256::from(0xabcu64),
            s: U256::from(0x1u64),
            v: 28,
        };
        let value = serde_json::to_value(signature).unwrap();
        assert_eq!(value, serde_json::json!({"r": "0xabc", "s": "0x1", "v": 28}));

        let back: ActionSignature = serde_json::from_value(value).unwrap();
        assert_eq!(back, signature);
    }
}
