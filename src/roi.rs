// 7.0: return on manipulation capital. pure function over a finished strategy result.

use crate::engine::StrategyResult;
use crate::types::Quote;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiReport {
    pub manipulation_cost: Quote,
    pub fry_minted: Decimal,
    pub fry_market_value: Quote,
    pub collateral_absorbed: Quote,
    pub total_value_extracted: Quote,
    pub net_profit: Quote,
    pub roi_fraction: Decimal,
    pub roi_percentage: Decimal,
}

/// `token_price_usd` is the assumed sale price of one minted token.
/// Zero deployed capital yields an roi of 0.
pub fn analyze_roi(result: &StrategyResult, token_price_usd: Decimal) -> RoiReport {
    calculate_roi(
        result.fry_minted,
        result.collateral_absorbed,
        result.manipulation_cost,
        token_price_usd,
    )
}

pub fn calculate_roi(
    fry_minted: Decimal,
    collateral_absorbed: Quote,
    manipulation_cost: Quote,
    token_price_usd: Decimal,
) -> RoiReport {
    let fry_market_value = Quote::new(fry_minted * token_price_usd);
    let total_value_extracted = fry_market_value.add(collateral_absorbed);
    let net_profit = total_value_extracted.sub(manipulation_cost);

    let roi_fraction = if manipulation_cost.value().is_zero() {
        Decimal::ZERO
    } else {
        net_profit.value() / manipulation_cost.value()
    };

    RoiReport {
        manipulation_cost,
        fry_minted,
        fry_market_value,
        collateral_absorbed,
        total_value_extracted,
        net_profit,
        roi_fraction,
        roi_percentage: roi_fraction * dec!(100),
    }
}
