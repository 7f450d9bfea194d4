/*
[INPUT]:  Resolved asset ids, wire-formatted numbers, signing context
[OUTPUT]: Exchange action payloads in the exact field order the exchange hashes
[POS]:    Data layer - `/exchange` action wire types
[UPDATE]: When adding actions or the exchange changes an action shape
*/

use alloy_primitives::Address;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::enums::{Grouping, TimeInForce, Tpsl};
use super::models::Cloid;
use crate::http::{HyperliquidError, Result};

/// Render a price or size as the exchange expects: at most 8 decimals,
/// trailing zeros stripped, negative zero as `0`
pub fn decimal_to_wire(value: Decimal) -> Result<String> {
    let rounded = value.round_dp(8);
    if rounded != value {
        return Err(HyperliquidError::InvalidNumber(format!(
            "{value} needs more than 8 decimals"
        )));
    }
    if rounded.is_zero() {
        return Ok("0".to_string());
    }
    Ok(rounded.normalize().to_string())
}

/// Convert a USD amount to integer micro-units (6 decimals)
pub fn usd_to_int(value: Decimal) -> Result<i64> {
    let scaled = value * Decimal::from(1_000_000);
    let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    if rounded != scaled {
        return Err(HyperliquidError::InvalidNumber(format!(
            "{value} needs more than 6 decimals"
        )));
    }
    i64::try_from(rounded)
        .map_err(|_| HyperliquidError::InvalidNumber(format!("{value} is out of range")))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitWire {
    pub tif: TimeInForce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerWire {
    pub is_market: bool,
    pub trigger_px: String,
    pub tpsl: Tpsl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderTypeWire {
    Limit(LimitWire),
    Trigger(TriggerWire),
}

/// Order in its compact wire form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWire {
    #[serde(rename = "a")]
    pub asset: u32,
    #[serde(rename = "b")]
    pub is_buy: bool,
    #[serde(rename = "p")]
    pub limit_px: String,
    #[serde(rename = "s")]
    pub sz: String,
    #[serde(rename = "r")]
    pub reduce_only: bool,
    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub cloid: Option<Cloid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelWire {
    #[serde(rename = "a")]
    pub asset: u32,
    #[serde(rename = "o")]
    pub oid: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: Cloid,
}

/// Order reference inside a modify: numeric oid or cloid string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OidWire {
    Oid(u64),
    Cloid(Cloid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyWire {
    pub oid: OidWire,
    pub order: OrderWire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTransfer {
    pub usdc: i64,
    pub to_perp: bool,
}

/// Chain name plus EIP-712 chain id stamped on user-signed actions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSignedEnvelope {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdSend {
    #[serde(flatten)]
    pub envelope: UserSignedEnvelope,
    pub destination: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSend {
    #[serde(flatten)]
    pub envelope: UserSignedEnvelope,
    pub destination: String,
    pub token: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdraw {
    #[serde(flatten)]
    pub envelope: UserSignedEnvelope,
    pub destination: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveAgent {
    #[serde(flatten)]
    pub envelope: UserSignedEnvelope,
    pub agent_address: Address,
    /// Signed as the empty string when absent, omitted from the posted body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub nonce: u64,
}

/// Every action the exchange endpoint accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Order {
        orders: Vec<OrderWire>,
        grouping: Grouping,
    },
    Cancel {
        cancels: Vec<CancelWire>,
    },
    CancelByCloid {
        cancels: Vec<CancelByCloidWire>,
    },
    BatchModify {
        modifies: Vec<ModifyWire>,
    },
    ScheduleCancel {
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateLeverage {
        asset: u32,
        is_cross: bool,
        leverage: u32,
    },
    #[serde(rename_all = "camelCase")]
    UpdateIsolatedMargin {
        asset: u32,
        is_buy: bool,
        ntli: i64,
    },
    SetReferrer {
        code: String,
    },
    CreateSubAccount {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    SpotUser {
        class_transfer: ClassTransfer,
    },
    #[serde(rename_all = "camelCase")]
    SubAccountTransfer {
        sub_account_user: String,
        is_deposit: bool,
        usd: i64,
    },
    UsdSend(UsdSend),
    SpotSend(SpotSend),
    #[serde(rename = "withdraw3")]
    Withdraw(Withdraw),
    ApproveAgent(ApproveAgent),
}

impl Action {
    /// User-signed actions are signed as EIP-712 typed data instead of
    /// through the msgpack action hash
    pub fn is_user_signed(&self) -> bool {
        matches!(
            self,
            Action::UsdSend(_) | Action::SpotSend(_) | Action::Withdraw(_) | Action::ApproveAgent(_)
        )
    }
}
