/*
[INPUT]:  Caller intent for orders, cancels and modifies
[OUTPUT]: Typed request structs resolved to wire actions by the exchange layer
[POS]:    Data layer - user-facing request types
[UPDATE]: When adding order kinds or request fields
*/

use rust_decimal::Decimal;

use super::enums::{TimeInForce, Tpsl};
use super::models::Cloid;

/// Order kind
#[derive(Debug, Clone, PartialEq)]
pub enum OrderType {
    Limit {
        tif: TimeInForce,
    },
    Trigger {
        trigger_px: Decimal,
        is_market: bool,
        tpsl: Tpsl,
    },
}

impl OrderType {
    pub fn gtc() -> Self {
        OrderType::Limit {
            tif: TimeInForce::Gtc,
        }
    }

    pub fn ioc() -> Self {
        OrderType::Limit {
            tif: TimeInForce::Ioc,
        }
    }

    pub fn alo() -> Self {
        OrderType::Limit {
            tif: TimeInForce::Alo,
        }
    }
}

/// Order placement keyed by coin name
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub coin: String,
    pub is_buy: bool,
    pub sz: Decimal,
    pub limit_px: Decimal,
    pub order_type: OrderType,
    pub reduce_only: bool,
    pub cloid: Option<Cloid>,
}

impl OrderRequest {
    pub fn limit(
        coin: impl Into<String>,
        is_buy: bool,
        sz: Decimal,
        limit_px: Decimal,
        tif: TimeInForce,
    ) -> Self {
        Self {
            coin: coin.into(),
            is_buy,
            sz,
            limit_px,
            order_type: OrderType::Limit { tif },
            reduce_only: false,
            cloid: None,
        }
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    pub fn with_cloid(mut self, cloid: Cloid) -> Self {
        self.cloid = Some(cloid);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelRequest {
    pub coin: String,
    pub oid: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelByCloidRequest {
    pub coin: String,
    pub cloid: Cloid,
}

/// Existing order reference for modifies and status queries
#[derive(Debug, Clone, PartialEq)]
pub enum OidOrCloid {
    Oid(u64),
    Cloid(Cloid),
}

impl From<u64> for OidOrCloid {
    fn from(oid: u64) -> Self {
        OidOrCloid::Oid(oid)
    }
}

impl From<Cloid> for OidOrCloid {
    fn from(cloid: Cloid) -> Self {
        OidOrCloid::Cloid(cloid)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyRequest {
    pub oid: OidOrCloid,
    pub order: OrderRequest,
}
