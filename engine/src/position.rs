use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decrease::{compute_decrease_amounts, DecreaseAmounts, DecreaseParams};
use crate::risk::{leverage, liquidation_price, will_position_collateral_be_sufficient, LiquidationParams};
use crate::types::{MarketInfo, Position};

/// Projection of the position after the decrease executes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextPositionValues {
    pub next_size_usd: Decimal,
    pub next_collateral_usd: Decimal,
    /// Absent on a full close.
    pub next_leverage: Option<Decimal>,
    pub next_liq_price: Option<Decimal>,
    pub next_pnl: Option<Decimal>,
    pub next_pnl_percentage: Option<Decimal>,
}

pub fn current_liquidation_price(pos: &Position, market: &MarketInfo, min_collateral_usd: Decimal) -> Option<Decimal> {
    liquidation_price(&LiquidationParams {
        side: pos.side,
        size_usd: pos.size_usd,
        size_in_tokens: pos.size_in_tokens,
        collateral_usd: pos.collateral_usd(),
        pending_fees_usd: pos.pending_fees_usd(),
        closing_fee_usd: pos.size_usd * market.position_fee_factor_negative_impact,
        min_collateral_factor: market.min_collateral_factor,
        min_collateral_usd,
    })
}

/// Pending borrowing and funding are settled by the decrease, so the projection carries none.
pub fn compute_next_position_values(
    pos: &Position,
    market: &MarketInfo,
    amounts: &DecreaseAmounts,
    min_collateral_usd: Decimal,
) -> NextPositionValues {
    if amounts.is_full_close {
        return NextPositionValues {
            next_size_usd: Decimal::ZERO,
            next_collateral_usd: Decimal::ZERO,
            next_leverage: None,
            next_liq_price: None,
            next_pnl: None,
            next_pnl_percentage: None,
        };
    }

    let next_size_usd = pos.size_usd - amounts.size_delta_usd;
    let next_size_in_tokens = pos.size_in_tokens - amounts.size_delta_in_tokens;
    let next_collateral_usd =
        (pos.collateral_usd() - amounts.collateral_delta_usd - amounts.payed_remaining_collateral_usd).max(Decimal::ZERO);
    let next_pnl = amounts.estimated_pnl - amounts.realized_pnl;
    let next_pnl_percentage = if next_collateral_usd.is_zero() {
        None
    } else {
        next_pnl.checked_mul(Decimal::ONE_HUNDRED).and_then(|v| v.checked_div(next_collateral_usd))
    };

    let next_liq_price = liquidation_price(&LiquidationParams {
        side: pos.side,
        size_usd: next_size_usd,
        size_in_tokens: next_size_in_tokens,
        collateral_usd: next_collateral_usd,
        pending_fees_usd: Decimal::ZERO,
        closing_fee_usd: next_size_usd * market.position_fee_factor_negative_impact,
        min_collateral_factor: market.min_collateral_factor,
        min_collateral_usd,
    });

    NextPositionValues {
        next_size_usd,
        next_collateral_usd,
        next_leverage: leverage(next_size_usd, next_collateral_usd, Decimal::ZERO),
        next_liq_price,
        next_pnl: Some(next_pnl),
        next_pnl_percentage,
    }
}

/// A plan with the keep-leverage option resolved.
///
/// `amounts` and `next_position_values` honour keep-leverage only when it was requested and the
/// remaining collateral can back it; otherwise they equal the "without" projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecreasePlan {
    pub amounts: DecreaseAmounts,
    pub next_position_values: NextPositionValues,
    pub next_position_values_without_keep_leverage: NextPositionValues,
    pub leverage_checkbox_disabled: bool,
    pub keep_leverage: bool,
}

pub fn plan_decrease(params: &DecreaseParams<'_>, min_collateral_usd: Decimal) -> Option<DecreasePlan> {
    let pos = params.position;
    let market = params.market;

    let with_keep = compute_decrease_amounts(&params.with_keep_leverage(true))?;
    let without_keep = compute_decrease_amounts(&params.with_keep_leverage(false))?;

    let leverage_checkbox_disabled = !with_keep.is_full_close
        && !will_position_collateral_be_sufficient(
            pos,
            with_keep.collateral_delta_usd,
            with_keep.realized_pnl,
            pos.size_usd - with_keep.size_delta_usd,
            market.min_collateral_factor,
        );
    let keep_leverage = params.keep_leverage && !leverage_checkbox_disabled && !without_keep.is_full_close;

    let next_without = compute_next_position_values(pos, market, &without_keep, min_collateral_usd);
    let (amounts, next_position_values) = if keep_leverage {
        let next = compute_next_position_values(pos, market, &with_keep, min_collateral_usd);
        (with_keep, next)
    } else {
        (without_keep, next_without.clone())
    };

    Some(DecreasePlan {
        amounts,
        next_position_values,
        next_position_values_without_keep_leverage: next_without,
        leverage_checkbox_disabled,
        keep_leverage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eth_market, long_eth_position};
    use crate::types::PriceRange;
    use rust_decimal_macros::dec;

    #[test]
    fn half_close_projects_remaining_position() {
        let pos = long_eth_position();
        let market = eth_market();
        let plan = plan_decrease(&DecreaseParams::market(&pos, &market, dec!(500), 30), dec!(1)).unwrap();
        let next = &plan.next_position_values;
        assert_eq!(next.next_size_usd, dec!(500));
        // the position fee comes out of the collateral that stays behind
        assert!(next.next_collateral_usd < dec!(100));
        assert!(next.next_leverage.unwrap() > dec!(5));
        assert!(next.next_liq_price.is_some());
        assert_eq!(next.next_pnl, Some(Decimal::ZERO));
    }

    #[test]
    fn full_close_has_no_leverage_fields() {
        let pos = long_eth_position();
        let market = eth_market();
        let plan = plan_decrease(&DecreaseParams::market(&pos, &market, dec!(1000), 30), dec!(1)).unwrap();
        assert!(plan.amounts.is_full_close);
        assert_eq!(plan.next_position_values.next_size_usd, Decimal::ZERO);
        assert_eq!(plan.next_position_values.next_leverage, None);
        assert_eq!(plan.next_position_values.next_liq_price, None);
        assert!(!plan.keep_leverage);
    }

    #[test]
    fn keep_leverage_holds_leverage_steady() {
        let pos = long_eth_position();
        let market = eth_market();
        let p = DecreaseParams::market(&pos, &market, dec!(500), 30).with_keep_leverage(true);
        let plan = plan_decrease(&p, dec!(1)).unwrap();
        assert!(!plan.leverage_checkbox_disabled);
        assert!(plan.keep_leverage);
        assert_eq!(plan.amounts.collateral_delta_usd, dec!(50));
        assert_eq!(plan.next_position_values.next_collateral_usd, dec!(50));
        assert_eq!(plan.next_position_values.next_leverage, Some(dec!(10)));
        assert_ne!(plan.next_position_values, plan.next_position_values_without_keep_leverage);
    }

    #[test]
    fn keep_leverage_is_disabled_when_collateral_cannot_back_the_rest() {
        // deep loss: withdrawing half the collateral leaves too little for the remaining size
        let mut pos = long_eth_position();
        pos.index_token.prices = PriceRange::flat(dec!(1850));
        let mut market = eth_market();
        market.min_collateral_factor = dec!(0.05);
        let p = DecreaseParams::market(&pos, &market, dec!(500), 30).with_keep_leverage(true);
        let plan = plan_decrease(&p, dec!(1)).unwrap();
        assert!(plan.leverage_checkbox_disabled);
        assert!(!plan.keep_leverage);
        assert_eq!(plan.next_position_values, plan.next_position_values_without_keep_leverage);
        assert_eq!(plan.amounts.collateral_delta_usd, Decimal::ZERO);
    }

    #[test]
    fn current_liquidation_price_includes_closing_fee() {
        let pos = long_eth_position();
        let market = eth_market();
        // (10 - (100 - 0.7) + 1000) / 0.5
        assert_eq!(current_liquidation_price(&pos, &market, dec!(1)), Some(dec!(1821.4)));
    }
}
