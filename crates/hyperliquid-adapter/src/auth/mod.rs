/*
[INPUT]:  Wallet keys and exchange actions
[OUTPUT]: Wallet signers and action signatures
[POS]:    Auth layer - signs Hyperliquid exchange actions
[UPDATE]: When signature schemes or wallet types change
*/

pub mod evm_wallet;
pub mod signing;
pub mod wallet;

pub use evm_wallet::EvmWalletSigner;
pub use signing::{
    action_hash, l1_signing_hash, sign_l1_action, sign_user_signed_action, user_signed_hash,
};
pub use wallet::{ActionSignature, MockWalletSigner, WalletSigner};
