use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::math::pow_int;
use crate::types::{MarketInfo, Side};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OpenInterest {
    pub long_usd: Decimal,
    pub short_usd: Decimal,
}

impl OpenInterest {
    fn diff(&self) -> Decimal { (self.long_usd - self.short_usd).abs() }
    fn long_le_short(&self) -> bool { self.long_usd <= self.short_usd }

    /// Open interest after removing `size_delta_usd` from `side`.
    pub fn after_decrease(&self, side: Side, size_delta_usd: Decimal) -> Self {
        match side {
            Side::Long => Self { long_usd: (self.long_usd - size_delta_usd).max(Decimal::ZERO), ..*self },
            Side::Short => Self { short_usd: (self.short_usd - size_delta_usd).max(Decimal::ZERO), ..*self },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactCurve {
    pub exponent: u32,
    pub positive_factor: Decimal,
    pub negative_factor: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionPriceImpact {
    /// Signed USD impact after caps; negative is a cost to the trader.
    pub price_impact_usd: Decimal,
    /// Negative impact above the cap; settled later as a claimable, shown as a fee.
    pub price_impact_diff_usd: Decimal,
    pub balance_was_improved: bool,
}

/// Raw impact from an open-interest move, before caps.
///
/// Same-side: `(d0^e - d1^e) * factor`, factor picked by whether the imbalance shrank.
/// Crossover: `d0^e * positive - d1^e * negative`.
pub fn price_impact_usd(current: &OpenInterest, next: &OpenInterest, curve: &ImpactCurve) -> Option<(Decimal, bool)> {
    let d0 = current.diff();
    let d1 = next.diff();
    let balance_was_improved = d1 < d0;

    let d0e = pow_int(d0, curve.exponent)?;
    let d1e = pow_int(d1, curve.exponent)?;

    let impact = if current.long_le_short() == next.long_le_short() {
        let factor = if balance_was_improved { curve.positive_factor } else { curve.negative_factor };
        (d0e - d1e).checked_mul(factor)?
    } else {
        d0e.checked_mul(curve.positive_factor)? - d1e.checked_mul(curve.negative_factor)?
    };
    Some((impact, balance_was_improved))
}

pub fn position_price_impact_for_decrease(market: &MarketInfo, side: Side, size_delta_usd: Decimal) -> Option<PositionPriceImpact> {
    if size_delta_usd.is_zero() {
        return Some(PositionPriceImpact {
            price_impact_usd: Decimal::ZERO,
            price_impact_diff_usd: Decimal::ZERO,
            balance_was_improved: false,
        });
    }
    let current = OpenInterest { long_usd: market.long_interest_usd, short_usd: market.short_interest_usd };
    let next = current.after_decrease(side, size_delta_usd);
    let curve = ImpactCurve {
        exponent: market.position_impact_exponent,
        positive_factor: market.position_impact_factor_positive,
        negative_factor: market.position_impact_factor_negative,
    };
    let (raw, balance_was_improved) = price_impact_usd(&current, &next, &curve)?;

    let (price_impact_usd, price_impact_diff_usd) = if raw >= Decimal::ZERO {
        let cap = size_delta_usd * market.max_position_impact_factor_positive;
        (raw.min(cap), Decimal::ZERO)
    } else {
        let cap = size_delta_usd * market.max_position_impact_factor_negative;
        let capped = raw.max(-cap);
        (capped, raw.abs() - capped.abs())
    };

    Some(PositionPriceImpact { price_impact_usd, price_impact_diff_usd, balance_was_improved })
}
