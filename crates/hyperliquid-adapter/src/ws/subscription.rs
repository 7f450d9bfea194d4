/*
[INPUT]:  Channel name plus coin/user/interval parameters
[OUTPUT]: Subscription descriptors and their routing keys
[POS]:    WebSocket layer - logical stream identity
[UPDATE]: When the exchange adds subscription channels
*/

use serde::{Deserialize, Serialize};

/// Logical push-data stream, serialised as `{"type": …, …params}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Subscription {
    AllMids,
    L2Book { coin: String },
    Trades { coin: String },
    Candle { coin: String, interval: String },
    Bbo { coin: String },
    UserEvents { user: String },
    UserFills { user: String },
    OrderUpdates { user: String },
    UserFundings { user: String },
    UserNonFundingLedgerUpdates { user: String },
    WebData2 { user: String },
    ActiveAssetCtx { coin: String },
    ActiveAssetData { coin: String, user: String },
}

impl Subscription {
    pub fn all_mids() -> Self {
        Subscription::AllMids
    }

    pub fn l2_book(coin: impl Into<String>) -> Self {
        Subscription::L2Book { coin: coin.into() }
    }

    pub fn trades(coin: impl Into<String>) -> Self {
        Subscription::Trades { coin: coin.into() }
    }

    pub fn candle(coin: impl Into<String>, interval: impl Into<String>) -> Self {
        Subscription::Candle {
            coin: coin.into(),
            interval: interval.into(),
        }
    }

    pub fn bbo(coin: impl Into<String>) -> Self {
        Subscription::Bbo { coin: coin.into() }
    }

    pub fn user_events(user: impl Into<String>) -> Self {
        Subscription::UserEvents { user: user.into() }
    }

    pub fn user_fills(user: impl Into<String>) -> Self {
        Subscription::UserFills { user: user.into() }
    }

    pub fn order_updates(user: impl Into<String>) -> Self {
        Subscription::OrderUpdates { user: user.into() }
    }

    pub fn user_fundings(user: impl Into<String>) -> Self {
        Subscription::UserFundings { user: user.into() }
    }

    pub fn ledger_updates(user: impl Into<String>) -> Self {
        Subscription::UserNonFundingLedgerUpdates { user: user.into() }
    }

    pub fn web_data(user: impl Into<String>) -> Self {
        Subscription::WebData2 { user: user.into() }
    }

    pub fn active_asset_ctx(coin: impl Into<String>) -> Self {
        Subscription::ActiveAssetCtx { coin: coin.into() }
    }

    pub fn active_asset_data(coin: impl Into<String>, user: impl Into<String>) -> Self {
        Subscription::ActiveAssetData {
            coin: coin.into(),
            user: user.into(),
        }
    }

    /// Wire name of the channel
    pub fn channel(&self) -> &'static str {
        match self {
            Subscription::AllMids => "allMids",
            Subscription::L2Book { .. } => "l2Book",
            Subscription::Trades { .. } => "trades",
            Subscription::Candle { .. } => "candle",
            Subscription::Bbo { .. } => "bbo",
            Subscription::UserEvents { .. } => "userEvents",
            Subscription::UserFills { .. } => "userFills",
            Subscription::OrderUpdates { .. } => "orderUpdates",
            Subscription::UserFundings { .. } => "userFundings",
            Subscription::UserNonFundingLedgerUpdates { .. } => "userNonFundingLedgerUpdates",
            Subscription::WebData2 { .. } => "webData2",
            Subscription::ActiveAssetCtx { .. } => "activeAssetCtx",
            Subscription::ActiveAssetData { .. } => "activeAssetData",
        }
    }

    pub fn coin(&self) -> Option<&str> {
        match self {
            Subscription::L2Book { coin }
            | Subscription::Trades { coin }
            | Subscription::Candle { coin, .. }
            | Subscription::Bbo { coin }
            | Subscription::ActiveAssetCtx { coin }
            | Subscription::ActiveAssetData { coin, .. } => Some(coin),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            Subscription::UserEvents { user }
            | Subscription::UserFills { user }
            | Subscription::OrderUpdates { user }
            | Subscription::UserFundings { user }
            | Subscription::UserNonFundingLedgerUpdates { user }
            | Subscription::WebData2 { user }
            | Subscription::ActiveAssetData { user, .. } => Some(user),
            _ => None,
        }
    }

    /// Channels whose pushes carry no user field, so one socket can only
    /// follow a single user on them
    pub fn is_single_user(&self) -> bool {
        matches!(
            self,
            Subscription::UserEvents { .. } | Subscription::OrderUpdates { .. }
        )
    }

    /// Registry identity, also derivable from inbound frames
    pub fn routing_key(&self) -> String {
        let channel = self.channel();
        match self {
            Subscription::AllMids
            | Subscription::UserEvents { .. }
            | Subscription::OrderUpdates { .. } => channel.to_string(),
            Subscription::L2Book { coin }
            | Subscription::Trades { coin }
            | Subscription::Bbo { coin }
            | Subscription::ActiveAssetCtx { coin } => {
                format!("{channel}:{}", coin.to_lowercase())
            }
            Subscription::Candle { coin, interval } => {
                format!("{channel}:{},{interval}", coin.to_lowercase())
            }
            Subscription::UserFills { user }
            | Subscription::UserFundings { user }
            | Subscription::UserNonFundingLedgerUpdates { user }
            | Subscription::WebData2 { user } => {
                format!("{channel}:{}", user.to_lowercase())
            }
            Subscription::ActiveAssetData { coin, user } => {
                format!(
                    "{channel}:{},{}",
                    coin.to_lowercase(),
                    user.to_lowercase()
                )
            }
        }
    }
}
