/*
[INPUT]:  Exchange actions, nonce, optional vault address, network
[OUTPUT]: EIP-712 signing hashes and wallet signatures for `/exchange`
[POS]:    Auth layer - action hashing and typed-data encoding
[UPDATE]: When the exchange changes its signing domains or type strings
*/

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use serde::Serialize;

use crate::auth::wallet::{ActionSignature, WalletSigner};
use crate::http::{HyperliquidError, Result};
use crate::types::{Action, ApproveAgent, SpotSend, UsdSend, UserSignedEnvelope, Withdraw};

/// Chain id the exchange expects in the user-signed envelope (421614)
pub const SIGNATURE_CHAIN_ID: &str = "0x66eee";
const USER_SIGNED_CHAIN_ID: u64 = 421_614;
const L1_CHAIN_ID: u64 = 1337;

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const AGENT_TYPE: &str = "Agent(string source,bytes32 connectionId)";
const USD_SEND_TYPE: &str = "HyperliquidTransaction:UsdSend(string hyperliquidChain,string destination,string amount,uint64 time)";
const SPOT_SEND_TYPE: &str = "HyperliquidTransaction:SpotSend(string hyperliquidChain,string destination,string token,string amount,uint64 time)";
const WITHDRAW_TYPE: &str = "HyperliquidTransaction:Withdraw(string hyperliquidChain,string destination,string amount,uint64 time)";
const APPROVE_AGENT_TYPE: &str = "HyperliquidTransaction:ApproveAgent(string hyperliquidChain,address agentAddress,string agentName,uint64 nonce)";

/// keccak256(msgpack(action) ‖ nonce BE ‖ vault flag [‖ vault])
pub fn action_hash<T: Serialize>(action: &T, vault: Option<Address>, nonce: u64) -> Result<B256> {
    let mut bytes = rmp_serde::to_vec_named(action)?;
    bytes.extend_from_slice(&nonce.to_be_bytes());
    match vault {
        Some(vault) => {
            bytes.push(1);
            bytes.extend_from_slice(vault.as_slice());
        }
        None => bytes.push(0),
    }
    Ok(keccak256(bytes))
}

fn domain_separator(name: &str, chain_id: u64) -> B256 {
    let encoded = (
        keccak256(EIP712_DOMAIN_TYPE),
        keccak256(name),
        keccak256("1"),
        U256::from(chain_id),
        Address::ZERO,
    )
        .abi_encode();
    keccak256(encoded)
}

/// keccak256("\x19\x01" ‖ domainSeparator ‖ structHash)
fn typed_data_hash(domain: B256, struct_hash: B256) -> B256 {
    let mut data = Vec::with_capacity(66);
    data.extend_from_slice(&[0x19, 0x01]);
    data.extend_from_slice(domain.as_slice());
    data.extend_from_slice(struct_hash.as_slice());
    keccak256(data)
}

/// Signing hash of the phantom agent wrapping an L1 action hash
pub fn l1_signing_hash(connection_id: B256, is_mainnet: bool) -> B256 {
    let source = if is_mainnet { "a" } else { "b" };
    let struct_hash = keccak256((keccak256(AGENT_TYPE), keccak256(source), connection_id).abi_encode());
    typed_data_hash(domain_separator("Exchange", L1_CHAIN_ID), struct_hash)
}

/// Sign an order/cancel/… action through the phantom-agent scheme
pub async fn sign_l1_action<W: WalletSigner + ?Sized>(
    wallet: &W,
    action: &Action,
    vault: Option<Address>,
    nonce: u64,
    is_mainnet: bool,
) -> Result<ActionSignature> {
    let connection_id = action_hash(action, vault, nonce)?;
    wallet
        .sign_hash(l1_signing_hash(connection_id, is_mainnet))
        .await
}

pub fn user_signed_envelope(is_mainnet: bool) -> UserSignedEnvelope {
    UserSignedEnvelope {
        signature_chain_id: SIGNATURE_CHAIN_ID.to_string(),
        hyperliquid_chain: if is_mainnet { "Mainnet" } else { "Testnet" }.to_string(),
    }
}

fn hash_str(value: &str) -> B256 {
    keccak256(value.as_bytes())
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse()
        .map_err(|e| HyperliquidError::Signing(format!("invalid destination {raw}: {e}")))
}

fn usd_send_struct_hash(action: &UsdSend) -> B256 {
    keccak256(
        (
            keccak256(USD_SEND_TYPE),
            hash_str(&action.envelope.hyperliquid_chain),
            hash_str(&action.destination),
            hash_str(&action.amount),
            action.time,
        )
            .abi_encode(),
    )
}

fn spot_send_struct_hash(action: &SpotSend) -> B256 {
    keccak256(
        (
            keccak256(SPOT_SEND_TYPE),
            hash_str(&action.envelope.hyperliquid_chain),
            hash_str(&action.destination),
            hash_str(&action.token),
            hash_str(&action.amount),
            action.time,
        )
            .abi_encode(),
    )
}

fn withdraw_struct_hash(action: &Withdraw) -> B256 {
    keccak256(
        (
            keccak256(WITHDRAW_TYPE),
            hash_str(&action.envelope.hyperliquid_chain),
            hash_str(&action.destination),
            hash_str(&action.amount),
            action.time,
        )
            .abi_encode(),
    )
}

fn approve_agent_struct_hash(action: &ApproveAgent) -> B256 {
    keccak256(
        (
            keccak256(APPROVE_AGENT_TYPE),
            hash_str(&action.envelope.hyperliquid_chain),
            action.agent_address,
            hash_str(action.agent_name.as_deref().unwrap_or_default()),
            action.nonce,
        )
            .abi_encode(),
    )
}

/// Signing hash of a user-signed action; `None` for L1 actions
pub fn user_signed_hash(action: &Action) -> Result<Option<B256>> {
    let struct_hash = match action {
        Action::UsdSend(inner) => {
            parse_address(&inner.destination)?;
            usd_send_struct_hash(inner)
        }
        Action::SpotSend(inner) => {
            parse_address(&inner.destination)?;
            spot_send_struct_hash(inner)
        }
        Action::Withdraw(inner) => {
            parse_address(&inner.destination)?;
            withdraw_struct_hash(inner)
        }
        Action::ApproveAgent(inner) => approve_agent_struct_hash(inner),
        _ => return Ok(None),
    };
    Ok(Some(typed_data_hash(
        domain_separator("HyperliquidSignTransaction", USER_SIGNED_CHAIN_ID),
        struct_hash,
    )))
}

/// Stamp the chain envelope onto a user-signed action and sign it
pub async fn sign_user_signed_action<W: WalletSigner + ?Sized>(
    wallet: &W,
    action: &mut Action,
    is_mainnet: bool,
) -> Result<ActionSignature> {
    let envelope = user_signed_envelope(is_mainnet);
    match action {
        Action::UsdSend(inner) => inner.envelope = envelope,
        Action::SpotSend(inner) => inner.envelope = envelope,
        Action::Withdraw(inner) => inner.envelope = envelope,
        Action::ApproveAgent(inner) => inner.envelope = envelope,
        _ => {
            return Err(HyperliquidError::Signing(
                "action is not user-signed".to_string(),
            ));
        }
    }
    let hash = user_signed_hash(action)?
        .ok_or_else(|| HyperliquidError::Signing("action is not user-signed".to_string()))?;
    wallet.sign_hash(hash).await
}
