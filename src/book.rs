// 3.0: the book of retail positions under attack. generated in batches, drained by liquidation.
// a liquidated position leaves the book immediately, so it can never be liquidated twice.

use crate::position::{PositionError, PositionParams, RetailPosition};
use crate::types::{Asset, Price, Quote, Side, TraderId};
use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inclusive decimal range used for uniform draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: Decimal,
    pub max: Decimal,
}

impl Range {
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    // 3.0.1: uniform draw through f64, rounded back to 8 dp. a degenerate range yields min.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Decimal {
        let (Some(lo), Some(hi)) = (self.min.to_f64(), self.max.to_f64()) else {
            return self.min;
        };
        if lo >= hi {
            return self.min;
        }
        let drawn: f64 = rng.gen_range(lo..=hi);
        Decimal::from_f64(drawn).map(|d| d.round_dp(8)).unwrap_or(self.min)
    }
}

/// How entry prices are drawn for an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum EntryModel {
    /// Entry = current price * (1 ± spread).
    Spread { spread: Decimal },
    /// Entry drawn from a fixed usd range, independent of the current price.
    Range { min: Decimal, max: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProfile {
    pub symbol: Asset,
    pub reference_price: Decimal,
    pub entry: EntryModel,
}

/// Everything the book needs to draw a batch of positions.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub assets: Vec<AssetProfile>,
    pub size_range: Range,
    pub leverage_range: Range,
    pub margin_fraction: Decimal,
    pub max_leverage: Decimal,
}

/// Outcome of one `generate` call.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub created: Vec<TraderId>,
    pub rejected: Vec<(TraderId, PositionError)>,
    pub opted_in: usize,
}

impl GenerationReport {
    pub fn opt_in_rate(&self) -> Decimal {
        if self.created.is_empty() {
            return Decimal::ZERO;
        }
        Decimal::from(self.opted_in) / Decimal::from(self.created.len())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: Vec<RetailPosition>,
    next_trader_id: u64,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[RetailPosition] {
        &self.positions
    }

    pub fn get(&self, trader_id: TraderId) -> Option<&RetailPosition> {
        self.positions.iter().find(|p| p.trader_id == trader_id)
    }

    // 3.1: draw `count` positions. a bad draw rejects that one position, never the batch.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        price_by_asset: &HashMap<Asset, Price>,
        opt_in_rate: Decimal,
        params: &GenerationParams,
        rng: &mut R,
    ) -> GenerationReport {
        let mut report = GenerationReport::default();
        if params.assets.is_empty() {
            return report;
        }

        let opt_in_p = opt_in_rate.to_f64().unwrap_or(0.0).clamp(0.0, 1.0);

        for _ in 0..count {
            let trader_id = TraderId(self.next_trader_id);
            self.next_trader_id += 1;

            let profile = &params.assets[rng.gen_range(0..params.assets.len())];
            let size = params.size_range.sample(rng);
            let leverage = params.leverage_range.sample(rng);
            let side = if rng.gen_bool(0.5) { Side::Long } else { Side::Short };

            let (entry_price, opening_price) = match &profile.entry {
                EntryModel::Spread { spread } => match price_by_asset.get(&profile.symbol) {
                    Some(current) => {
                        let factor = Range::new(Decimal::ONE - spread, Decimal::ONE + spread).sample(rng);
                        (current.value() * factor, Some(*current))
                    }
                    None => {
                        report
                            .rejected
                            .push((trader_id, PositionError::UnknownAssetPrice(profile.symbol.clone())));
                        continue;
                    }
                },
                EntryModel::Range { min, max } => (Range::new(*min, *max).sample(rng), None),
            };

            let opt_in = rng.gen_bool(opt_in_p);

            let built = RetailPosition::new(
                PositionParams {
                    trader_id,
                    asset: profile.symbol.clone(),
                    size,
                    leverage,
                    entry_price,
                    side,
                    opt_in,
                },
                params.margin_fraction,
                params.max_leverage,
            );

            // an entry drawn off the current price can already sit past its liquidation price
            let built = built.and_then(|position| match opening_price {
                Some(current) if position.is_liquidated(current) => {
                    Err(PositionError::LiquidatableAtOpen {
                        liquidation_price: position.liquidation_price.value(),
                        current_price: current.value(),
                    })
                }
                _ => Ok(position),
            });

            match built {
                Ok(position) => {
                    if position.opt_in {
                        report.opted_in += 1;
                    }
                    report.created.push(trader_id);
                    self.positions.push(position);
                }
                Err(e) => report.rejected.push((trader_id, e)),
            }
        }

        report
    }

    // 3.2: split the asset's positions into liquidated/surviving, drop the liquidated ones
    pub fn liquidate_all(&mut self, current_price: Price, asset: &Asset) -> Vec<RetailPosition> {
        let (liquidated, surviving): (Vec<_>, Vec<_>) = std::mem::take(&mut self.positions)
            .into_iter()
            .partition(|p| &p.asset == asset && p.is_liquidated(current_price));
        self.positions = surviving;
        liquidated
    }

    pub fn opted_in<'a>(&'a self, asset: &'a Asset) -> impl Iterator<Item = &'a RetailPosition> + 'a {
        self.positions.iter().filter(move |p| p.opt_in && &p.asset == asset)
    }

    pub fn opt_in_collateral(&self, asset: &Asset) -> Quote {
        self.opted_in(asset).map(|p| p.collateral_locked).sum()
    }

    pub fn count_for(&self, asset: &Asset) -> usize {
        self.positions.iter().filter(|p| &p.asset == asset).count()
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            assets: vec![AssetProfile {
                symbol: Asset::from("BTC"),
                reference_price: dec!(45000),
                entry: EntryModel::Spread { spread: dec!(0.05) },
            }],
            size_range: Range::new(dec!(1000), dec!(100000)),
            leverage_range: Range::new(dec!(2), dec!(100)),
            margin_fraction: dec!(0.8),
            max_leverage: dec!(100),
        }
    }
}
