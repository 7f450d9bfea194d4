/*
[INPUT]:  Order/cancel/transfer requests, wallet signer, asset map
[OUTPUT]: Signed `/exchange` submissions and their typed replies
[POS]:    HTTP layer - trading endpoints (require action signature)
[UPDATE]: When adding new exchange actions or changing the signing flow
*/

use std::sync::Arc;

use alloy_primitives::Address;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::signing::{sign_l1_action, sign_user_signed_action, user_signed_envelope};
use crate::auth::{ActionSignature, EvmWalletSigner, WalletSigner};
use crate::http::assets::AssetMap;
use crate::http::{HyperliquidClient, HyperliquidError, Result};
use crate::types::{
    Action, ApproveAgent, CancelByCloidRequest, CancelByCloidWire, CancelRequest, CancelWire,
    ClassTransfer, Cloid, ExchangeData, ExchangeResponse, Grouping, LimitWire, ModifyRequest,
    ModifyWire, OidOrCloid, OidWire, OrderRequest, OrderType, OrderTypeWire, OrderWire, SpotSend,
    TimeInForce, TriggerWire, UsdSend, Withdraw, decimal_to_wire, usd_to_int,
};

/// Default max slippage for market orders (5%)
pub const DEFAULT_SLIPPAGE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Current Unix time in milliseconds, used as the action nonce
pub fn timestamp_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangePayload<'a> {
    action: &'a Action,
    nonce: u64,
    signature: ActionSignature,
    vault_address: Option<Address>,
}

/// Convert an order request to its wire form
pub fn order_request_to_wire(order: &OrderRequest, asset: u32) -> Result<OrderWire> {
    let order_type = match &order.order_type {
        OrderType::Limit { tif } => OrderTypeWire::Limit(LimitWire { tif: *tif }),
        OrderType::Trigger {
            trigger_px,
            is_market,
            tpsl,
        } => OrderTypeWire::Trigger(TriggerWire {
            is_market: *is_market,
            trigger_px: decimal_to_wire(*trigger_px)?,
            tpsl: *tpsl,
        }),
    };

    Ok(OrderWire {
        asset,
        is_buy: order.is_buy,
        limit_px: decimal_to_wire(order.limit_px)?,
        sz: decimal_to_wire(order.sz)?,
        reduce_only: order.reduce_only,
        order_type,
        cloid: order.cloid.clone(),
    })
}

/// Signs actions with a wallet and posts them to `/exchange`
pub struct Exchange {
    client: HyperliquidClient,
    wallet: Arc<dyn WalletSigner>,
    assets: AssetMap,
    vault_address: Option<Address>,
    account_address: Option<Address>,
}

impl Exchange {
    /// Create an exchange handle, fetching perp and spot metadata
    pub async fn new(client: HyperliquidClient, wallet: Arc<dyn WalletSigner>) -> Result<Self> {
        let meta = client.meta().await?;
        let spot_meta = client.spot_meta().await?;
        let assets = AssetMap::new(&meta, &spot_meta);
        Ok(Self::with_asset_map(client, wallet, assets))
    }

    pub fn with_asset_map(
        client: HyperliquidClient,
        wallet: Arc<dyn WalletSigner>,
        assets: AssetMap,
    ) -> Self {
        Self {
            client,
            wallet,
            assets,
            vault_address: None,
            account_address: None,
        }
    }

    /// Trade on behalf of a vault or sub-account
    pub fn with_vault_address(mut self, vault: Address) -> Self {
        self.vault_address = Some(vault);
        self
    }

    /// Account whose positions `market_close` reads when an agent wallet signs
    pub fn with_account_address(mut self, account: Address) -> Self {
        self.account_address = Some(account);
        self
    }

    pub fn assets(&self) -> &AssetMap {
        &self.assets
    }

    pub fn client(&self) -> &HyperliquidClient {
        &self.client
    }

    fn is_mainnet(&self) -> bool {
        self.client.network().is_mainnet()
    }

    async fn post_action(
        &self,
        action: &Action,
        signature: ActionSignature,
        nonce: u64,
    ) -> Result<ExchangeData> {
        let payload = ExchangePayload {
            action,
            nonce,
            signature,
            vault_address: self.vault_address,
        };
        debug!(nonce, "posting exchange action");

        match self.client.post_exchange(&payload).await? {
            ExchangeResponse::Ok(data) => Ok(data),
            ExchangeResponse::Err(message) => {
                warn!(error = %message, "exchange rejected action");
                Err(HyperliquidError::ActionRejected(message))
            }
        }
    }

    async fn sign_and_post_l1(&self, action: Action, vault: Option<Address>) -> Result<ExchangeData> {
        let nonce = timestamp_ms();
        let signature =
            sign_l1_action(self.wallet.as_ref(), &action, vault, nonce, self.is_mainnet()).await?;
        self.post_action(&action, signature, nonce).await
    }

    async fn sign_and_post_user(&self, mut action: Action, nonce: u64) -> Result<ExchangeData> {
        let signature =
            sign_user_signed_action(self.wallet.as_ref(), &mut action, self.is_mainnet()).await?;
        self.post_action(&action, signature, nonce).await
    }

    /// Place a single order
    pub async fn order(&self, order: OrderRequest) -> Result<ExchangeData> {
        self.bulk_orders(vec![order]).await
    }

    pub async fn bulk_orders(&self, orders: Vec<OrderRequest>) -> Result<ExchangeData> {
        let orders = orders
            .iter()
            .map(|order| order_request_to_wire(order, self.assets.asset(&order.coin)?))
            .collect::<Result<Vec<_>>>()?;
        info!(count = orders.len(), "placing orders");
        self.sign_and_post_l1(
            Action::Order {
                orders,
                grouping: Grouping::Na,
            },
            self.vault_address,
        )
        .await
    }

    pub async fn modify_order(&self, modify: ModifyRequest) -> Result<ExchangeData> {
        self.bulk_modify_orders(vec![modify]).await
    }

    pub async fn bulk_modify_orders(&self, modifies: Vec<ModifyRequest>) -> Result<ExchangeData> {
        let modifies = modifies
            .iter()
            .map(|modify| {
                let oid = match &modify.oid {
                    OidOrCloid::Oid(oid) => OidWire::Oid(*oid),
                    OidOrCloid::Cloid(cloid) => OidWire::Cloid(cloid.clone()),
                };
                let asset = self.assets.asset(&modify.order.coin)?;
                Ok(ModifyWire {
                    oid,
                    order: order_request_to_wire(&modify.order, asset)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.sign_and_post_l1(Action::BatchModify { modifies }, self.vault_address)
            .await
    }

    /// Aggressive IOC limit price: mid (or `px`) moved by `slippage`, rounded
    /// to 5 significant figures and 6 (perp) / 8 (spot) decimals
    pub async fn slippage_price(
        &self,
        coin: &str,
        is_buy: bool,
        slippage: Decimal,
        px: Option<Decimal>,
    ) -> Result<Decimal> {
        let coin = self.assets.coin(coin)?.to_string();
        let px = match px {
            Some(px) => px,
            None => self
                .client
                .all_mids()
                .await?
                .get(&coin)
                .ok_or_else(|| HyperliquidError::UnknownAsset(coin.clone()))?,
        };
        let is_spot = AssetMap::is_spot(self.assets.asset(&coin)?);
        Ok(slippage_adjusted(px, is_buy, slippage, is_spot))
    }

    fn round_size(&self, coin: &str, sz: Decimal) -> Result<Decimal> {
        let asset = self.assets.asset(coin)?;
        Ok(match self.assets.sz_decimals(asset) {
            Some(decimals) => sz.round_dp(decimals),
            None => sz,
        })
    }

    /// Market order as an IOC limit at the slippage price
    pub async fn market_open(
        &self,
        coin: &str,
        is_buy: bool,
        sz: Decimal,
        px: Option<Decimal>,
        slippage: Decimal,
        cloid: Option<Cloid>,
    ) -> Result<ExchangeData> {
        let limit_px = self.slippage_price(coin, is_buy, slippage, px).await?;
        let order = OrderRequest {
            coin: coin.to_string(),
            is_buy,
            sz: self.round_size(coin, sz)?,
            limit_px,
            order_type: OrderType::Limit {
                tif: TimeInForce::Ioc,
            },
            reduce_only: false,
            cloid,
        };
        self.order(order).await
    }

    /// Close (part of) the current position in `coin`; `None` when flat
    pub async fn market_close(
        &self,
        coin: &str,
        sz: Option<Decimal>,
        px: Option<Decimal>,
        slippage: Decimal,
        cloid: Option<Cloid>,
    ) -> Result<Option<ExchangeData>> {
        let address = self
            .vault_address
            .or(self.account_address)
            .unwrap_or_else(|| self.wallet.address());
        let state = self.client.user_state(&address.to_string()).await?;

        let Some(position) = state.position(coin).filter(|p| !p.szi.is_zero()) else {
            info!(coin, "no open position to close");
            return Ok(None);
        };

        let is_buy = position.szi.is_sign_negative();
        let sz = sz.unwrap_or_else(|| position.szi.abs());
        let limit_px = self.slippage_price(coin, is_buy, slippage, px).await?;
        let order = OrderRequest {
            coin: coin.to_string(),
            is_buy,
            sz: self.round_size(coin, sz)?,
            limit_px,
            order_type: OrderType::Limit {
                tif: TimeInForce::Ioc,
            },
            reduce_only: true,
            cloid,
        };
        self.order(order).await.map(Some)
    }

    pub async fn cancel(&self, coin: &str, oid: u64) -> Result<ExchangeData> {
        self.bulk_cancel(vec![CancelRequest {
            coin: coin.to_string(),
            oid,
        }])
        .await
    }

    pub async fn cancel_by_cloid(&self, coin: &str, cloid: Cloid) -> Result<ExchangeData> {
        self.bulk_cancel_by_cloid(vec![CancelByCloidRequest {
            coin: coin.to_string(),
            cloid,
        }])
        .await
    }

    pub async fn bulk_cancel(&self, cancels: Vec<CancelRequest>) -> Result<ExchangeData> {
        let cancels = cancels
            .iter()
            .map(|cancel| {
                Ok(CancelWire {
                    asset: self.assets.asset(&cancel.coin)?,
                    oid: cancel.oid,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.sign_and_post_l1(Action::Cancel { cancels }, self.vault_address)
            .await
    }

    pub async fn bulk_cancel_by_cloid(
        &self,
        cancels: Vec<CancelByCloidRequest>,
    ) -> Result<ExchangeData> {
        let cancels = cancels
            .into_iter()
            .map(|cancel| {
                Ok(CancelByCloidWire {
                    asset: self.assets.asset(&cancel.coin)?,
                    cloid: cancel.cloid,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.sign_and_post_l1(Action::CancelByCloid { cancels }, self.vault_address)
            .await
    }

    /// Schedule a cancel-all at `time` (UTC ms); `None` unsets it
    pub async fn schedule_cancel(&self, time: Option<u64>) -> Result<ExchangeData> {
        self.sign_and_post_l1(Action::ScheduleCancel { time }, self.vault_address)
            .await
    }

    pub async fn update_leverage(
        &self,
        leverage: u32,
        coin: &str,
        is_cross: bool,
    ) -> Result<ExchangeData> {
        let asset = self.assets.asset(coin)?;
        self.sign_and_post_l1(
            Action::UpdateLeverage {
                asset,
                is_cross,
                leverage,
            },
            self.vault_address,
        )
        .await
    }

    /// Add (positive) or remove (negative) isolated margin in USD
    pub async fn update_isolated_margin(&self, amount: Decimal, coin: &str) -> Result<ExchangeData> {
        let asset = self.assets.asset(coin)?;
        self.sign_and_post_l1(
            Action::UpdateIsolatedMargin {
                asset,
                is_buy: true,
                ntli: usd_to_int(amount)?,
            },
            self.vault_address,
        )
        .await
    }

    pub async fn set_referrer(&self, code: &str) -> Result<ExchangeData> {
        self.sign_and_post_l1(
            Action::SetReferrer {
                code: code.to_string(),
            },
            None,
        )
        .await
    }

    pub async fn create_sub_account(&self, name: &str) -> Result<ExchangeData> {
        self.sign_and_post_l1(
            Action::CreateSubAccount {
                name: name.to_string(),
            },
            None,
        )
        .await
    }

    /// Move USDC between the spot and perp balances (2-decimal precision)
    pub async fn user_spot_transfer(&self, usdc: Decimal, to_perp: bool) -> Result<ExchangeData> {
        self.sign_and_post_l1(
            Action::SpotUser {
                class_transfer: ClassTransfer {
                    usdc: usd_to_int(usdc.round_dp(2))?,
                    to_perp,
                },
            },
            self.vault_address,
        )
        .await
    }

    /// `usd` is in micro-units
    pub async fn sub_account_transfer(
        &self,
        sub_account_user: &str,
        is_deposit: bool,
        usd: i64,
    ) -> Result<ExchangeData> {
        self.sign_and_post_l1(
            Action::SubAccountTransfer {
                sub_account_user: sub_account_user.to_string(),
                is_deposit,
                usd,
            },
            None,
        )
        .await
    }

    pub async fn usd_transfer(&self, amount: Decimal, destination: &str) -> Result<ExchangeData> {
        let time = timestamp_ms();
        let action = Action::UsdSend(UsdSend {
            envelope: user_signed_envelope(self.is_mainnet()),
            destination: destination.to_string(),
            amount: decimal_to_wire(amount)?,
            time,
        });
        self.sign_and_post_user(action, time).await
    }

    /// Send a spot token (`NAME:0xtokenid`)
    pub async fn spot_transfer(
        &self,
        amount: Decimal,
        destination: &str,
        token: &str,
    ) -> Result<ExchangeData> {
        let time = timestamp_ms();
        let action = Action::SpotSend(SpotSend {
            envelope: user_signed_envelope(self.is_mainnet()),
            destination: destination.to_string(),
            token: token.to_string(),
            amount: decimal_to_wire(amount)?,
            time,
        });
        self.sign_and_post_user(action, time).await
    }

    pub async fn withdraw_from_bridge(
        &self,
        amount: Decimal,
        destination: &str,
    ) -> Result<ExchangeData> {
        let time = timestamp_ms();
        let action = Action::Withdraw(Withdraw {
            envelope: user_signed_envelope(self.is_mainnet()),
            destination: destination.to_string(),
            amount: decimal_to_wire(amount)?,
            time,
        });
        self.sign_and_post_user(action, time).await
    }

    /// Approve a freshly generated agent key; returns the reply and the
    /// agent's private key
    pub async fn approve_agent(&self, name: Option<&str>) -> Result<(ExchangeData, String)> {
        let agent = EvmWalletSigner::random()?;
        let nonce = timestamp_ms();
        let action = Action::ApproveAgent(ApproveAgent {
            envelope: user_signed_envelope(self.is_mainnet()),
            agent_address: agent.address(),
            agent_name: name.map(str::to_string),
            nonce,
        });
        let data = self.sign_and_post_user(action, nonce).await?;
        Ok((data, agent.private_key_hex()))
    }
}

/// Apply slippage and round like the exchange UI does
pub fn slippage_adjusted(px: Decimal, is_buy: bool, slippage: Decimal, is_spot: bool) -> Decimal {
    let factor = if is_buy {
        Decimal::ONE + slippage
    } else {
        Decimal::ONE - slippage
    };
    let adjusted = px * factor;
    let significant = adjusted.round_sf(5).unwrap_or(adjusted);
    significant.round_dp(if is_spot { 8 } else { 6 }).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn test_default_slippage() {
        assert_eq!(DEFAULT_SLIPPAGE, dec("0.05"));
    }

    #[rstest]
    #[case("1000", true, false, "1050")]
    #[case("1000", false, false, "950")]
    #[case("3456.789", true, false, "3629.6")]
    #[case("0.123456789", true, true, "0.12963")]
    #[case("0.0001234567", false, false, "0.000117")]
    fn test_slippage_adjusted(
        #[case] px: &str,
        #[case] is_buy: bool,
        #[case] is_spot: bool,
        #[case] expected: &str,
    ) {
        let adjusted = slippage_adjusted(dec(px), is_buy, DEFAULT_SLIPPAGE, is_spot);
        assert_eq!(adjusted, dec(expected));
    }

    #[test]
    fn test_order_request_to_wire() {
        let order = OrderRequest::limit("ETH", true, dec("0.2000"), dec("1100.0"), TimeInForce::Alo)
            .with_cloid(Cloid::from_u128(9));
        let wire = order_request_to_wire(&order, 1).unwrap();
        assert_eq!(wire.asset, 1);
        assert_eq!(wire.sz, "0.2");
        assert_eq!(wire.limit_px, "1100");
        assert_eq!(wire.order_type, OrderTypeWire::Limit(LimitWire { tif: TimeInForce::Alo }));
        assert_eq!(wire.cloid, Some(Cloid::from_u128(9)));
    }

    #[test]
    fn test_order_request_rejects_excess_precision() {
        let order = OrderRequest::limit("ETH", true, dec("0.000000001"), dec("1"), TimeInForce::Gtc);
        assert!(matches!(
            order_request_to_wire(&order, 1),
            Err(HyperliquidError::InvalidNumber(_))
        ));
    }
}
