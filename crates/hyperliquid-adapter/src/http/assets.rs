/*
[INPUT]:  Perp `Meta` and `SpotMeta` universes
[OUTPUT]: Coin name -> asset id and size-decimal lookups
[POS]:    HTTP layer - asset resolution for exchange actions
[UPDATE]: When the exchange changes asset numbering
*/

use std::collections::HashMap;

use crate::http::{HyperliquidError, Result};
use crate::types::{Meta, SpotMeta};

/// Spot asset ids are offset from perp ids
pub const SPOT_ASSET_OFFSET: u32 = 10_000;

#[derive(Debug, Clone, Default)]
pub struct AssetMap {
    coin_to_asset: HashMap<String, u32>,
    name_to_coin: HashMap<String, String>,
    asset_to_sz_decimals: HashMap<u32, u32>,
}

impl AssetMap {
    pub fn new(meta: &Meta, spot_meta: &SpotMeta) -> Self {
        let mut map = Self::default();

        for spot in &spot_meta.universe {
            let asset = spot.index + SPOT_ASSET_OFFSET;
            map.coin_to_asset.insert(spot.name.clone(), asset);
            map.name_to_coin.insert(spot.name.clone(), spot.name.clone());

            let [base, quote] = spot.tokens;
            if let (Some(base), Some(quote)) = (spot_meta.tokens.get(base), spot_meta.tokens.get(quote)) {
                map.asset_to_sz_decimals.insert(asset, base.sz_decimals);
                map.name_to_coin
                    .entry(format!("{}/{}", base.name, quote.name))
                    .or_insert_with(|| spot.name.clone());
            }
        }

        for (index, info) in meta.universe.iter().enumerate() {
            let asset = index as u32;
            map.coin_to_asset.insert(info.name.clone(), asset);
            map.name_to_coin.insert(info.name.clone(), info.name.clone());
            map.asset_to_sz_decimals.insert(asset, info.sz_decimals);
        }

        map
    }

    /// Exchange coin for a display name (`PURR/USDC` -> `PURR/USDC` or `@7`)
    pub fn coin(&self, name: &str) -> Result<&str> {
        self.name_to_coin
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| HyperliquidError::UnknownAsset(name.to_string()))
    }

    /// Asset id for a coin or display name
    pub fn asset(&self, name: &str) -> Result<u32> {
        let coin = self.coin(name)?;
        self.coin_to_asset
            .get(coin)
            .copied()
            .ok_or_else(|| HyperliquidError::UnknownAsset(name.to_string()))
    }

    pub fn sz_decimals(&self, asset: u32) -> Option<u32> {
        self.asset_to_sz_decimals.get(&asset).copied()
    }

    pub fn is_spot(asset: u32) -> bool {
        asset >= SPOT_ASSET_OFFSET
    }
}
