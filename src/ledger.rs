//! Collateral sweep ledger.
//!
//! Every swept loss becomes an immutable [`LossRecord`] and mints tokens at a
//! multiplier derived from leverage, size, loss severity and whether the loss
//! came from a liquidation. The pool is append-only: records are never edited
//! or removed, and the running totals are updated in the same call that
//! appends the record.

use crate::types::{Asset, Leverage, LossId, Quote, Timestamp, TraderId, USD_DECIMAL_PLACES};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MIN_MULTIPLIER: Decimal = dec!(1.0);
pub const MAX_MULTIPLIER: Decimal = dec!(50.0);

const LEVERAGE_CAP: Decimal = dec!(10.0);
const SIZE_CAP: Decimal = dec!(5.0);
const SEVERITY_CAP: Decimal = dec!(3.0);
const SIZE_UNIT_USD: Decimal = dec!(10000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
    pub id: LossId,
    pub trader_ref: String,
    pub loss_amount: Quote,
    pub asset: Asset,
    pub timestamp: Timestamp,
    pub leverage: Leverage,
    pub position_size: Quote,
    pub liquidation: bool,
    pub fry_minted: Decimal,
    pub multiplier: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub total_fry_minted: Decimal,
    pub total_collateral_swept: Quote,
    pub losses_in_pool: usize,
}

/// Snapshot written to the export under `cdo_final_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_fry_minted: Decimal,
    pub total_collateral_swept_usd: Quote,
    pub active_tranches: usize,
    pub losses_in_pool: usize,
}

/// The four capped factors and their combined, clamped product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplierBreakdown {
    pub leverage_factor: Decimal,
    pub size_factor: Decimal,
    pub severity: Decimal,
    pub severity_factor: Decimal,
    pub liquidation_factor: Decimal,
    pub raw: Decimal,
    pub multiplier: Decimal,
}

/// One swept loss as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReceipt {
    pub record_id: LossId,
    pub trader_ref: String,
    pub minted: Decimal,
    pub multiplier: Decimal,
}

/// Input to [`CollateralSweepLedger::sweep`].
#[derive(Debug, Clone)]
pub struct SweepRequest<'a> {
    pub trader_id: TraderId,
    pub loss_amount: Quote,
    pub asset: &'a Asset,
    pub leverage: Leverage,
    pub position_size: Quote,
    pub liquidation: bool,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CollateralSweepLedger {
    loss_pool: Vec<LossRecord>,
    totals: LedgerTotals,
    // reserved for tranche bookkeeping. nothing populates it.
    tranches: BTreeMap<String, Quote>,
    anonymizer_key: [u8; 32],
    next_id: u64,
}

impl CollateralSweepLedger {
    /// `anonymizer_key` salts the trader hash so references can't be mapped
    /// back to trader ids without it.
    pub fn new(anonymizer_key: [u8; 32]) -> Self {
        Self {
            loss_pool: Vec::new(),
            totals: LedgerTotals::default(),
            tranches: BTreeMap::new(),
            anonymizer_key,
            next_id: 1,
        }
    }

    pub fn sweep(&mut self, request: SweepRequest<'_>) -> SweepReceipt {
        // a gain is never swept as a loss
        let loss_amount = request.loss_amount.max(Quote::zero());

        let breakdown = calculate_multiplier(
            request.leverage,
            request.position_size,
            loss_amount,
            request.liquidation,
        );
        let minted = loss_amount.value() * breakdown.multiplier;

        let id = LossId(self.next_id);
        self.next_id += 1;

        let trader_ref = self.anonymize(request.trader_id, id);

        self.loss_pool.push(LossRecord {
            id,
            trader_ref: trader_ref.clone(),
            loss_amount,
            asset: request.asset.clone(),
            timestamp: request.timestamp,
            leverage: request.leverage,
            position_size: request.position_size,
            liquidation: request.liquidation,
            fry_minted: minted,
            multiplier: breakdown.multiplier,
        });

        self.totals.total_fry_minted += minted;
        self.totals.total_collateral_swept = self.totals.total_collateral_swept.add(loss_amount);
        self.totals.losses_in_pool += 1;

        SweepReceipt {
            record_id: id,
            trader_ref,
            minted,
            multiplier: breakdown.multiplier,
        }
    }

    pub fn get_totals(&self) -> LedgerTotals {
        self.totals
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_fry_minted: self.totals.total_fry_minted,
            total_collateral_swept_usd: self.totals.total_collateral_swept,
            active_tranches: self.tranches.len(),
            losses_in_pool: self.totals.losses_in_pool,
        }
    }

    pub fn records(&self) -> &[LossRecord] {
        &self.loss_pool
    }

    pub fn record(&self, id: LossId) -> Option<&LossRecord> {
        self.loss_pool.iter().find(|r| r.id == id)
    }

    // 16 hex chars of keyed blake3 over trader id + record id
    fn anonymize(&self, trader_id: TraderId, id: LossId) -> String {
        let mut hasher = blake3::Hasher::new_keyed(&self.anonymizer_key);
        hasher.update(&trader_id.0.to_le_bytes());
        hasher.update(&id.0.to_le_bytes());
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..16].to_string()
    }
}

impl Default for CollateralSweepLedger {
    fn default() -> Self {
        Self::new([0u8; 32])
    }
}

/// Each factor is capped on its own, then the product is clamped to [1, 50]
/// and rounded to 8 places. Position size is floored at 1 usd in the severity term.
pub fn calculate_multiplier(
    leverage: Leverage,
    position_size: Quote,
    loss_amount: Quote,
    liquidation: bool,
) -> MultiplierBreakdown {
    let leverage_factor = (leverage.value() / dec!(10)).min(LEVERAGE_CAP);
    let size_factor = (position_size.value() / SIZE_UNIT_USD).min(SIZE_CAP);
    let severity = loss_amount.value() / position_size.value().max(Decimal::ONE);
    let severity_factor = (severity * dec!(2)).min(SEVERITY_CAP);
    let liquidation_factor = if liquidation { dec!(2.0) } else { dec!(1.0) };

    let raw = leverage_factor * size_factor * severity_factor * liquidation_factor;

    MultiplierBreakdown {
        leverage_factor,
        size_factor,
        severity,
        severity_factor,
        liquidation_factor,
        raw,
        multiplier: raw.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER).round_dp(USD_DECIMAL_PLACES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(asset: &Asset, loss: Decimal, size: Decimal, leverage: Decimal) -> SweepRequest<'_> {
        SweepRequest {
            trader_id: TraderId(1),
            loss_amount: Quote::new(loss),
            asset,
            leverage: Leverage::new(leverage).unwrap(),
            position_size: Quote::new(size),
            liquidation: true,
            timestamp: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn multiplier_worked_example() {
        let b = calculate_multiplier(
            Leverage::new(dec!(50)).unwrap(),
            Quote::new(dec!(10000)),
            Quote::new(dec!(8000)),
            true,
        );
        assert_eq!(b.leverage_factor, dec!(5));
        assert_eq!(b.size_factor, dec!(1));
        assert_eq!(b.severity, dec!(0.8));
        assert_eq!(b.severity_factor, dec!(1.6));
        assert_eq!(b.liquidation_factor, dec!(2));
        assert_eq!(b.multiplier, dec!(16));
    }

    #[test]
    fn multiplier_caps_at_fifty() {
        let b = calculate_multiplier(
            Leverage::new(dec!(100)).unwrap(),
            Quote::new(dec!(100000)),
            Quote::new(dec!(100000)),
            true,
        );
        // 10 * 5 * 2 * 2 = 200 before the cap
        assert_eq!(b.raw, dec!(200));
        assert_eq!(b.multiplier, MAX_MULTIPLIER);
    }

    #[test]
    fn multiplier_floors_at_one() {
        let b = calculate_multiplier(
            Leverage::new(dec!(2)).unwrap(),
            Quote::new(dec!(1000)),
            Quote::new(dec!(10)),
            false,
        );
        assert!(b.raw < Decimal::ONE);
        assert_eq!(b.multiplier, MIN_MULTIPLIER);
    }

    #[test]
    fn zero_size_clamps_denominator() {
        let b = calculate_multiplier(
            Leverage::new(dec!(10)).unwrap(),
            Quote::zero(),
            Quote::new(dec!(0.5)),
            true,
        );
        assert_eq!(b.severity, dec!(0.5));
        assert_eq!(b.multiplier, MIN_MULTIPLIER);
    }

    #[test]
    fn sweep_records_and_totals() {
        let btc = Asset::from("BTC");
        let mut ledger = CollateralSweepLedger::default();

        let receipt = ledger.sweep(request(&btc, dec!(8000), dec!(10000), dec!(50)));
        assert_eq!(receipt.record_id, LossId(1));
        assert_eq!(receipt.minted, dec!(128000));

        let record = ledger.record(receipt.record_id).unwrap();
        assert_eq!(record.fry_minted, record.loss_amount.value() * record.multiplier);
        assert_eq!(record.trader_ref.len(), 16);

        let totals = ledger.get_totals();
        assert_eq!(totals.total_fry_minted, dec!(128000));
        assert_eq!(totals.total_collateral_swept.value(), dec!(8000));
        assert_eq!(totals.losses_in_pool, 1);
    }

    #[test]
    fn identical_sweeps_are_distinct_records() {
        let btc = Asset::from("BTC");
        let mut ledger = CollateralSweepLedger::new([7u8; 32]);

        let a = ledger.sweep(request(&btc, dec!(100), dec!(5000), dec!(20)));
        let b = ledger.sweep(request(&btc, dec!(100), dec!(5000), dec!(20)));

        assert_ne!(a.record_id, b.record_id);
        assert_eq!(ledger.records().len(), 2);
        assert_ne!(ledger.records()[0].trader_ref, ledger.records()[1].trader_ref);
    }

    #[test]
    fn trader_ref_depends_on_key() {
        let btc = Asset::from("BTC");
        let mut one = CollateralSweepLedger::new([1u8; 32]);
        let mut two = CollateralSweepLedger::new([2u8; 32]);
        one.sweep(request(&btc, dec!(100), dec!(5000), dec!(20)));
        two.sweep(request(&btc, dec!(100), dec!(5000), dec!(20)));

        assert_ne!(one.records()[0].trader_ref, two.records()[0].trader_ref);
        assert!(!one.records()[0].trader_ref.contains("trader_"));
    }

    #[test]
    fn negative_loss_mints_nothing() {
        let btc = Asset::from("BTC");
        let mut ledger = CollateralSweepLedger::default();

        let receipt = ledger.sweep(request(&btc, dec!(-500), dec!(10000), dec!(20)));
        assert_eq!(receipt.minted, Decimal::ZERO);
        assert_eq!(ledger.records()[0].loss_amount, Quote::zero());
        assert_eq!(ledger.get_totals().total_fry_minted, Decimal::ZERO);
        assert_eq!(ledger.get_totals().total_collateral_swept, Quote::zero());
    }

    #[test]
    fn multiplier_has_fixed_places() {
        // severity 1/3 does not terminate
        let b = calculate_multiplier(
            Leverage::new(dec!(30)).unwrap(),
            Quote::new(dec!(30000)),
            Quote::new(dec!(10000)),
            false,
        );
        assert_eq!(b.multiplier, dec!(6.00000000));
        let b = calculate_multiplier(
            Leverage::new(dec!(70)).unwrap(),
            Quote::new(dec!(30000)),
            Quote::new(dec!(1000)),
            true,
        );
        assert!(b.multiplier.scale() <= USD_DECIMAL_PLACES);
    }

    #[test]
    fn stats_report_no_tranches() {
        let ledger = CollateralSweepLedger::default();
        let stats = ledger.stats();
        assert_eq!(stats.active_tranches, 0);
        assert_eq!(stats.losses_in_pool, 0);
    }
}
