/*
[INPUT]:  Coin names, user addresses, time ranges
[OUTPUT]: Market metadata, order books, account state and history
[POS]:    HTTP layer - `/info` query endpoints (no signature required)
[UPDATE]: When adding new info queries or changing response format
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{HyperliquidClient, Result};
use crate::types::{AllMids, Candle, Cloid, Fill, L2Book, Meta, OpenOrder, SpotMeta, UserState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleSnapshotRequest {
    pub coin: String,
    pub interval: String,
    pub start_time: u64,
    pub end_time: u64,
}

/// Order reference accepted by `orderStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderRef {
    Oid(u64),
    Cloid(Cloid),
}

/// Body of a POST /info request, shared with WebSocket `post` requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest {
    AllMids,
    Meta,
    SpotMeta,
    MetaAndAssetCtxs,
    SpotMetaAndAssetCtxs,
    ClearinghouseState {
        user: String,
    },
    SpotClearinghouseState {
        user: String,
    },
    OpenOrders {
        user: String,
    },
    FrontendOpenOrders {
        user: String,
    },
    UserFills {
        user: String,
    },
    #[serde(rename_all = "camelCase")]
    UserFillsByTime {
        user: String,
        start_time: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_time: Option<u64>,
    },
    UserFees {
        user: String,
    },
    #[serde(rename_all = "camelCase")]
    FundingHistory {
        coin: String,
        start_time: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_time: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    UserFunding {
        user: String,
        start_time: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_time: Option<u64>,
    },
    L2Book {
        coin: String,
    },
    CandleSnapshot {
        req: CandleSnapshotRequest,
    },
    OrderStatus {
        user: String,
        oid: OrderRef,
    },
    Referral {
        user: String,
    },
    SubAccounts {
        user: String,
    },
    DelegatorSummary {
        user: String,
    },
    Delegations {
        user: String,
    },
    DelegatorRewards {
        user: String,
    },
}

impl HyperliquidClient {
    /// Mid price of every coin
    pub async fn all_mids(&self) -> Result<AllMids> {
        self.post_info(&InfoRequest::AllMids).await
    }

    /// Perpetuals universe
    pub async fn meta(&self) -> Result<Meta> {
        self.post_info(&InfoRequest::Meta).await
    }

    pub async fn spot_meta(&self) -> Result<SpotMeta> {
        self.post_info(&InfoRequest::SpotMeta).await
    }

    pub async fn meta_and_asset_ctxs(&self) -> Result<Value> {
        self.post_info(&InfoRequest::MetaAndAssetCtxs).await
    }

    pub async fn spot_meta_and_asset_ctxs(&self) -> Result<Value> {
        self.post_info(&InfoRequest::SpotMetaAndAssetCtxs).await
    }

    /// Perpetuals positions and margin summary
    pub async fn user_state(&self, user: &str) -> Result<UserState> {
        self.post_info(&InfoRequest::ClearinghouseState {
            user: user.to_string(),
        })
        .await
    }

    pub async fn spot_user_state(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::SpotClearinghouseState {
            user: user.to_string(),
        })
        .await
    }

    pub async fn open_orders(&self, user: &str) -> Result<Vec<OpenOrder>> {
        self.post_info(&InfoRequest::OpenOrders {
            user: user.to_string(),
        })
        .await
    }

    /// Open orders with trigger and child-order detail
    pub async fn frontend_open_orders(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::FrontendOpenOrders {
            user: user.to_string(),
        })
        .await
    }

    /// Most recent fills (at most 2000)
    pub async fn user_fills(&self, user: &str) -> Result<Vec<Fill>> {
        self.post_info(&InfoRequest::UserFills {
            user: user.to_string(),
        })
        .await
    }

    pub async fn user_fills_by_time(
        &self,
        user: &str,
        start_time: u64,
        end_time: Option<u64>,
    ) -> Result<Vec<Fill>> {
        self.post_info(&InfoRequest::UserFillsByTime {
            user: user.to_string(),
            start_time,
            end_time,
        })
        .await
    }

    pub async fn user_fees(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::UserFees {
            user: user.to_string(),
        })
        .await
    }

    pub async fn funding_history(
        &self,
        coin: &str,
        start_time: u64,
        end_time: Option<u64>,
    ) -> Result<Value> {
        self.post_info(&InfoRequest::FundingHistory {
            coin: coin.to_string(),
            start_time,
            end_time,
        })
        .await
    }

    pub async fn user_funding_history(
        &self,
        user: &str,
        start_time: u64,
        end_time: Option<u64>,
    ) -> Result<Value> {
        self.post_info(&InfoRequest::UserFunding {
            user: user.to_string(),
            start_time,
            end_time,
        })
        .await
    }

    /// Order book snapshot (up to 20 levels per side)
    pub async fn l2_snapshot(&self, coin: &str) -> Result<L2Book> {
        self.post_info(&InfoRequest::L2Book {
            coin: coin.to_string(),
        })
        .await
    }

    pub async fn candles_snapshot(
        &self,
        coin: &str,
        interval: &str,
        start_time: u64,
        end_time: u64,
    ) -> Result<Vec<Candle>> {
        self.post_info(&InfoRequest::CandleSnapshot {
            req: CandleSnapshotRequest {
                coin: coin.to_string(),
                interval: interval.to_string(),
                start_time,
                end_time,
            },
        })
        .await
    }

    pub async fn query_order_by_oid(&self, user: &str, oid: u64) -> Result<Value> {
        self.post_info(&InfoRequest::OrderStatus {
            user: user.to_string(),
            oid: OrderRef::Oid(oid),
        })
        .await
    }

    pub async fn query_order_by_cloid(&self, user: &str, cloid: &Cloid) -> Result<Value> {
        self.post_info(&InfoRequest::OrderStatus {
            user: user.to_string(),
            oid: OrderRef::Cloid(cloid.clone()),
        })
        .await
    }

    pub async fn query_referral_state(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::Referral {
            user: user.to_string(),
        })
        .await
    }

    pub async fn query_sub_accounts(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::SubAccounts {
            user: user.to_string(),
        })
        .await
    }

    pub async fn user_staking_summary(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::DelegatorSummary {
            user: user.to_string(),
        })
        .await
    }

    pub async fn user_staking_delegations(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::Delegations {
            user: user.to_string(),
        })
        .await
    }

    pub async fn user_staking_rewards(&self, user: &str) -> Result<Value> {
        self.post_info(&InfoRequest::DelegatorRewards {
            user: user.to_string(),
        })
        .await
    }
}
