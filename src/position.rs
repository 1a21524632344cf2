// 2.0: one retail trader's leveraged position. pnl = size * pct move, sign flipped for shorts.
// 2.1 has the liquidation price formula at the bottom.

use crate::types::{Asset, Leverage, Price, Quote, Side, TraderId, USD_DECIMAL_PLACES};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// smallest liquidation price a long can have once the distance exceeds 100%
const MIN_LIQUIDATION_PRICE: Decimal = dec!(0.0001);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailPosition {
    pub trader_id: TraderId,
    pub asset: Asset,
    pub size: Quote,
    pub leverage: Leverage,
    pub entry_price: Price,
    pub side: Side,
    pub collateral_locked: Quote,
    pub liquidation_price: Price,
    pub opt_in: bool,
}

/// Parameters a single position is built from.
#[derive(Debug, Clone)]
pub struct PositionParams {
    pub trader_id: TraderId,
    pub asset: Asset,
    pub size: Decimal,
    pub leverage: Decimal,
    pub entry_price: Decimal,
    pub side: Side,
    pub opt_in: bool,
}

impl RetailPosition {
    /// Validates the raw parameters and derives collateral and liquidation price.
    pub fn new(
        params: PositionParams,
        margin_fraction: Decimal,
        max_leverage: Decimal,
    ) -> Result<Self, PositionError> {
        if params.size <= Decimal::ZERO {
            return Err(PositionError::NonPositiveSize(params.size));
        }
        let leverage =
            Leverage::new(params.leverage).ok_or(PositionError::NonPositiveLeverage(params.leverage))?;
        if leverage.value() > max_leverage {
            return Err(PositionError::LeverageAboveVenueMax {
                leverage: leverage.value(),
                max: max_leverage,
            });
        }
        let entry_price =
            Price::new(params.entry_price).ok_or(PositionError::NonPositivePrice(params.entry_price))?;

        let size = Quote::new(params.size);

        Ok(Self {
            trader_id: params.trader_id,
            asset: params.asset,
            size,
            leverage,
            entry_price,
            side: params.side,
            collateral_locked: leverage.collateral_for(size),
            liquidation_price: calculate_liquidation_price(
                entry_price,
                leverage,
                params.side,
                margin_fraction,
            ),
            opt_in: params.opt_in,
        })
    }

    pub fn is_long(&self) -> bool {
        self.side.is_long()
    }

    // 2.0.1: paper gain/loss at the given price
    pub fn pnl(&self, current_price: Price) -> Quote {
        calculate_pnl(self.size, self.entry_price, current_price, self.side)
    }

    pub fn is_liquidated(&self, current_price: Price) -> bool {
        match self.side {
            Side::Long => current_price <= self.liquidation_price,
            Side::Short => current_price >= self.liquidation_price,
        }
    }
}

// 2.0.2: size * (current - entry) / entry, negated for shorts
pub fn calculate_pnl(size: Quote, entry_price: Price, current_price: Price, side: Side) -> Quote {
    let change = (current_price.value() - entry_price.value()) / entry_price.value();
    Quote::new((size.value() * change * side.sign()).round_dp(USD_DECIMAL_PLACES))
}

// 2.1: liquidation distance = margin_fraction / leverage, applied against entry in the loss direction
pub fn calculate_liquidation_price(
    entry_price: Price,
    leverage: Leverage,
    side: Side,
    margin_fraction: Decimal,
) -> Price {
    let distance = margin_fraction / leverage.value();

    let liq_price = match side {
        Side::Long => entry_price.value() * (Decimal::ONE - distance),
        Side::Short => entry_price.value() * (Decimal::ONE + distance),
    };

    Price::new_unchecked(liq_price.max(MIN_LIQUIDATION_PRICE))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionError {
    #[error("Position size must be positive, got {0}")]
    NonPositiveSize(Decimal),

    #[error("Leverage must be positive, got {0}")]
    NonPositiveLeverage(Decimal),

    #[error("Leverage {leverage} exceeds venue maximum {max}")]
    LeverageAboveVenueMax { leverage: Decimal, max: Decimal },

    #[error("Entry price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Liquidation price {liquidation_price} already crossed at opening price {current_price}")]
    LiquidatableAtOpen {
        liquidation_price: Decimal,
        current_price: Decimal,
    },

    #[error("No current price for asset {0}")]
    UnknownAssetPrice(Asset),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params(side: Side, leverage: Decimal) -> PositionParams {
        PositionParams {
            trader_id: TraderId(1),
            asset: Asset::from("BTC"),
            size: dec!(10000),
            leverage,
            entry_price: dec!(50000),
            side,
            opt_in: true,
        }
    }

    #[test]
    fn derived_fields_long() {
        let pos = RetailPosition::new(params(Side::Long, dec!(10)), dec!(0.8), dec!(100)).unwrap();
        assert_eq!(pos.collateral_locked.value(), dec!(1000));
        // 0.8 / 10 = 8% below entry
        assert_eq!(pos.liquidation_price.value(), dec!(46000));
    }

    #[test]
    fn derived_fields_short() {
        let pos = RetailPosition::new(params(Side::Short, dec!(20)), dec!(0.8), dec!(100)).unwrap();
        assert_eq!(pos.collateral_locked.value(), dec!(500));
        assert_eq!(pos.liquidation_price.value(), dec!(52000));
    }

    #[test]
    fn pnl_sign_flips_for_shorts() {
        let long = RetailPosition::new(params(Side::Long, dec!(10)), dec!(0.8), dec!(100)).unwrap();
        let short = RetailPosition::new(params(Side::Short, dec!(10)), dec!(0.8), dec!(100)).unwrap();
        let down = Price::new_unchecked(dec!(45000));

        // 10% drop on 10k notional
        assert_eq!(long.pnl(down).value(), dec!(-1000));
        assert_eq!(short.pnl(down).value(), dec!(1000));
    }

    #[test]
    fn liquidation_is_inclusive_at_threshold() {
        let long = RetailPosition::new(params(Side::Long, dec!(10)), dec!(0.8), dec!(100)).unwrap();
        assert!(!long.is_liquidated(Price::new_unchecked(dec!(46000.01))));
        assert!(long.is_liquidated(Price::new_unchecked(dec!(46000))));

        let short = RetailPosition::new(params(Side::Short, dec!(10)), dec!(0.8), dec!(100)).unwrap();
        assert!(!short.is_liquidated(Price::new_unchecked(dec!(53999.99))));
        assert!(short.is_liquidated(Price::new_unchecked(dec!(54000))));
    }

    #[test]
    fn rejects_invalid_parameters() {
        let mut p = params(Side::Long, dec!(10));
        p.size = Decimal::ZERO;
        assert_eq!(
            RetailPosition::new(p, dec!(0.8), dec!(100)),
            Err(PositionError::NonPositiveSize(Decimal::ZERO))
        );

        let p = params(Side::Long, dec!(0));
        assert!(matches!(
            RetailPosition::new(p, dec!(0.8), dec!(100)),
            Err(PositionError::NonPositiveLeverage(_))
        ));

        let p = params(Side::Long, dec!(125));
        assert!(matches!(
            RetailPosition::new(p, dec!(0.8), dec!(100)),
            Err(PositionError::LeverageAboveVenueMax { .. })
        ));

        let mut p = params(Side::Short, dec!(10));
        p.entry_price = dec!(-5);
        assert!(matches!(
            RetailPosition::new(p, dec!(0.8), dec!(100)),
            Err(PositionError::NonPositivePrice(_))
        ));
    }

    #[test]
    fn pnl_rounds_to_fixed_places() {
        let pnl = calculate_pnl(
            Quote::new(dec!(10000)),
            Price::new_unchecked(dec!(30000)),
            Price::new_unchecked(dec!(20000)),
            Side::Long,
        );
        assert_eq!(pnl.value(), dec!(-3333.33333333));
    }

    #[test]
    fn long_liquidation_price_floors_above_zero() {
        let entry = Price::new_unchecked(dec!(100));
        let lev = Leverage::new(dec!(0.5)).unwrap();
        let liq = calculate_liquidation_price(entry, lev, Side::Long, dec!(0.8));
        assert!(liq.value() > Decimal::ZERO);
        assert!(liq < entry);
    }
}
