/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs for market, metadata and account data
[POS]:    Data layer - type definitions shared by REST and WebSocket payloads
[UPDATE]: When API schema changes or new types added
*/

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::enums::Side;
use crate::http::{HyperliquidError, Result};

/// Client order id: 16 bytes rendered as `0x` + 32 lowercase hex digits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cloid([u8; 16]);

impl Cloid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn to_raw(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Cloid {
    type Err = HyperliquidError;

    fn from_str(raw: &str) -> Result<Self> {
        let digits = raw
            .strip_prefix("0x")
            .ok_or_else(|| HyperliquidError::InvalidCloid(format!("{raw} is not a hex string")))?;
        if digits.len() != 32 {
            return Err(HyperliquidError::InvalidCloid(format!(
                "{raw} is not 16 bytes"
            )));
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| HyperliquidError::InvalidCloid(format!("{raw}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Cloid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

impl Serialize for Cloid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_raw())
    }
}

impl<'de> Deserialize<'de> for Cloid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Cloid::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub name: String,
    pub sz_decimals: u32,
    #[serde(default)]
    pub max_leverage: Option<u32>,
    #[serde(default)]
    pub only_isolated: Option<bool>,
}

/// Perpetuals universe; an asset's index in `universe` is its asset id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub universe: Vec<AssetInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotAssetInfo {
    pub name: String,
    pub tokens: [usize; 2],
    pub index: u32,
    pub is_canonical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotTokenInfo {
    pub name: String,
    pub sz_decimals: u32,
    pub wei_decimals: u32,
    pub index: u32,
    pub token_id: String,
    pub is_canonical: bool,
    #[serde(default)]
    pub evm_contract: Option<serde_json::Value>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotMeta {
    pub universe: Vec<SpotAssetInfo>,
    pub tokens: Vec<SpotTokenInfo>,
}

/// Mid price per coin
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllMids(
    #[serde(
        deserialize_with = "serde_helpers::deserialize_decimal_map",
        serialize_with = "serde_helpers::serialize_decimal_map"
    )]
    pub HashMap<String, Decimal>,
);

impl AllMids {
    pub fn get(&self, coin: &str) -> Option<Decimal> {
        self.0.get(coin).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2Level {
    #[serde(with = "rust_decimal::serde::str")]
    pub px: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub sz: Decimal,
    /// Number of orders at this level
    pub n: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2Book {
    pub coin: String,
    /// `[bids, asks]`
    pub levels: Vec<Vec<L2Level>>,
    pub time: u64,
}

impl L2Book {
    pub fn bids(&self) -> &[L2Level] {
        self.levels.first().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn asks(&self) -> &[L2Level] {
        self.levels.get(1).map(Vec::as_slice).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub coin: String,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub px: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub sz: Decimal,
    pub hash: String,
    pub time: u64,
    #[serde(default)]
    pub tid: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bbo {
    pub coin: String,
    pub time: u64,
    /// `[best bid, best ask]`, either side may be empty
    pub bbo: Vec<Option<L2Level>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub coin: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub px: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub sz: Decimal,
    pub side: Side,
    pub time: u64,
    #[serde(with = "rust_decimal::serde::str")]
    pub start_position: Decimal,
    pub dir: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub closed_pnl: Decimal,
    pub hash: String,
    pub oid: u64,
    pub crossed: bool,
    #[serde(with = "rust_decimal::serde::str")]
    pub fee: Decimal,
    pub tid: u64,
    #[serde(default)]
    pub fee_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time (ms)
    #[serde(rename = "t")]
    pub open_time: u64,
    /// Close time (ms)
    #[serde(rename = "T")]
    pub close_time: u64,
    #[serde(rename = "s")]
    pub coin: String,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o", with = "rust_decimal::serde::str")]
    pub open: Decimal,
    #[serde(rename = "c", with = "rust_decimal::serde::str")]
    pub close: Decimal,
    #[serde(rename = "h", with = "rust_decimal::serde::str")]
    pub high: Decimal,
    #[serde(rename = "l", with = "rust_decimal::serde::str")]
    pub low: Decimal,
    #[serde(rename = "v", with = "rust_decimal::serde::str")]
    pub volume: Decimal,
    #[serde(rename = "n")]
    pub trades: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicOrder {
    pub coin: String,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub limit_px: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub sz: Decimal,
    pub oid: u64,
    pub timestamp: u64,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub orig_sz: Option<Decimal>,
    #[serde(default)]
    pub cloid: Option<String>,
}

/// Open order as returned by the `openOrders` query
pub type OpenOrder = BasicOrder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub order: BasicOrder,
    pub status: String,
    pub status_timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leverage {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: u32,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub raw_usd: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    pub coin: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub szi: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub entry_px: Option<Decimal>,
    pub leverage: Leverage,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub liquidation_px: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str")]
    pub margin_used: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub position_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub return_on_equity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unrealized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPosition {
    pub position: PositionData,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    #[serde(with = "rust_decimal::serde::str")]
    pub account_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_margin_used: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_ntl_pos: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_raw_usd: Decimal,
}

/// Perpetuals clearinghouse state of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    pub asset_positions: Vec<AssetPosition>,
    pub margin_summary: MarginSummary,
    pub cross_margin_summary: MarginSummary,
    #[serde(with = "rust_decimal::serde::str")]
    pub withdrawable: Decimal,
}

impl UserState {
    pub fn position(&self, coin: &str) -> Option<&PositionData> {
        self.asset_positions
            .iter()
            .map(|p| &p.position)
            .find(|p| p.coin == coin)
    }
}

mod serde_helpers {
    use super::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::str::FromStr;

    pub fn deserialize_decimal_map<'de, D>(
        deserializer: D,
    ) -> Result<HashMap<String, Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: HashMap<String, String> = HashMap::deserialize(deserializer)?;
        values
            .into_iter()
            .map(|(coin, value)| {
                Decimal::from_str(&value)
                    .map(|decimal| (coin, decimal))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }

    pub fn serialize_decimal_map<S>(
        values: &HashMap<String, Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let strings: HashMap<&str, String> = values
            .iter()
            .map(|(coin, value)| (coin.as_str(), value.to_string()))
            .collect();
        strings.serialize(serializer)
    }
}
