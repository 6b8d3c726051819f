use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::math::to_bps;
use crate::swap::SwapStep;
use crate::types::{MarketInfo, ReferralInfo};

/// A signed fee line; negative `delta_usd` is paid by the trader.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct FeeItem {
    pub delta_usd: Decimal,
    pub bps: Decimal,
}

pub fn fee_item(delta_usd: Decimal, basis_usd: Decimal) -> FeeItem {
    FeeItem { delta_usd, bps: to_bps(delta_usd, basis_usd) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapFeeItem {
    pub market_address: String,
    pub token_in: String,
    pub token_out: String,
    pub delta_usd: Decimal,
    pub bps: Decimal,
}

/// Position fee charged on `size_delta_usd`; trades that shrink the imbalance pay the lower rate.
pub fn position_fee_usd(market: &MarketInfo, size_delta_usd: Decimal, balance_was_improved: bool) -> Decimal {
    let factor = if balance_was_improved {
        market.position_fee_factor_positive_impact
    } else {
        market.position_fee_factor_negative_impact
    };
    size_delta_usd * factor
}

pub fn fee_discount_usd(position_fee_usd: Decimal, referral: Option<&ReferralInfo>) -> Decimal {
    referral.map(|r| position_fee_usd * r.discount_factor).unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone)]
pub struct TradeFeesParams<'a> {
    pub initial_collateral_usd: Decimal,
    pub size_delta_usd: Decimal,
    pub swap_steps: &'a [SwapStep],
    pub position_fee_usd: Decimal,
    pub swap_price_impact_delta_usd: Decimal,
    pub position_price_impact_delta_usd: Decimal,
    pub price_impact_diff_usd: Decimal,
    pub borrowing_fee_usd: Decimal,
    pub funding_fee_usd: Decimal,
    pub fee_discount_usd: Decimal,
    pub swap_profit_fee_usd: Decimal,
    pub ui_fee_factor: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TradeFees {
    pub total_fees: FeeItem,
    pub position_fee: FeeItem,
    pub ui_fee: FeeItem,
    pub ui_swap_fee: FeeItem,
    pub swap_fees: Vec<SwapFeeItem>,
    pub swap_profit_fee: FeeItem,
    pub swap_price_impact: FeeItem,
    pub position_price_impact: FeeItem,
    pub price_impact_diff: FeeItem,
    pub borrow_fee: FeeItem,
    pub funding_fee: FeeItem,
    pub fee_discount_usd: Decimal,
}

pub fn get_trade_fees(p: &TradeFeesParams<'_>) -> TradeFees {
    let collateral = p.initial_collateral_usd;

    let swap_fees: Vec<SwapFeeItem> = p
        .swap_steps
        .iter()
        .map(|step| SwapFeeItem {
            market_address: step.market_address.clone(),
            token_in: step.token_in.clone(),
            token_out: step.token_out.clone(),
            delta_usd: -step.swap_fee_usd,
            bps: to_bps(-step.swap_fee_usd, collateral),
        })
        .collect();
    let swap_volume_usd: Decimal = p.swap_steps.iter().map(|s| s.usd_out).sum();

    let position_fee = fee_item(-(p.position_fee_usd - p.fee_discount_usd), p.size_delta_usd);
    let ui_fee = fee_item(-(p.size_delta_usd * p.ui_fee_factor), collateral);
    let ui_swap_fee = fee_item(-(swap_volume_usd * p.ui_fee_factor), collateral);
    let swap_profit_fee = fee_item(-p.swap_profit_fee_usd, collateral);
    let swap_price_impact = fee_item(p.swap_price_impact_delta_usd, collateral);
    let position_price_impact = fee_item(p.position_price_impact_delta_usd, p.size_delta_usd);
    let price_impact_diff = fee_item(-p.price_impact_diff_usd, p.size_delta_usd);
    let borrow_fee = fee_item(-p.borrowing_fee_usd, collateral);
    let funding_fee = fee_item(-p.funding_fee_usd, collateral);

    let total_delta_usd: Decimal = swap_fees.iter().map(|f| f.delta_usd).sum::<Decimal>()
        + [
            position_fee,
            ui_fee,
            ui_swap_fee,
            swap_profit_fee,
            swap_price_impact,
            position_price_impact,
            price_impact_diff,
            borrow_fee,
            funding_fee,
        ]
        .iter()
        .map(|f| f.delta_usd)
        .sum::<Decimal>();

    TradeFees {
        total_fees: fee_item(total_delta_usd, collateral),
        position_fee,
        ui_fee,
        ui_swap_fee,
        swap_fees,
        swap_profit_fee,
        swap_price_impact,
        position_price_impact,
        price_impact_diff,
        borrow_fee,
        funding_fee,
        fee_discount_usd: p.fee_discount_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::eth_market;
    use rust_decimal_macros::dec;

    fn params(steps: &[SwapStep]) -> TradeFeesParams<'_> {
        TradeFeesParams {
            initial_collateral_usd: dec!(100),
            size_delta_usd: dec!(500),
            swap_steps: steps,
            position_fee_usd: dec!(0.35),
            swap_price_impact_delta_usd: Decimal::ZERO,
            position_price_impact_delta_usd: dec!(-0.5),
            price_impact_diff_usd: Decimal::ZERO,
            borrowing_fee_usd: dec!(0.1),
            funding_fee_usd: dec!(0.05),
            fee_discount_usd: dec!(0.035),
            swap_profit_fee_usd: Decimal::ZERO,
            ui_fee_factor: Decimal::ZERO,
        }
    }

    #[test]
    fn position_fee_rate_depends_on_balance() {
        let market = eth_market();
        assert_eq!(position_fee_usd(&market, dec!(1000), true), dec!(0.5));
        assert_eq!(position_fee_usd(&market, dec!(1000), false), dec!(0.7));
    }

    #[test]
    fn discount_applies_referral_factor() {
        let r = ReferralInfo { referral_code: Some("gmx".into()), discount_factor: dec!(0.1) };
        assert_eq!(fee_discount_usd(dec!(0.7), Some(&r)), dec!(0.07));
        assert_eq!(fee_discount_usd(dec!(0.7), None), Decimal::ZERO);
    }

    #[test]
    fn totals_sum_every_leg() {
        let fees = get_trade_fees(&params(&[]));
        assert_eq!(fees.position_fee.delta_usd, dec!(-0.315));
        // -0.315 - 0.5 - 0.1 - 0.05
        assert_eq!(fees.total_fees.delta_usd, dec!(-0.965));
        assert_eq!(fees.total_fees.bps, dec!(-96.5));
        assert_eq!(fees.position_price_impact.bps, dec!(-10));
    }

    #[test]
    fn swap_steps_become_fee_lines_and_ui_volume() {
        let steps = [SwapStep {
            market_address: "0xmarket".into(),
            token_in: "USDC".into(),
            token_out: "WETH".into(),
            swap_fee_usd: dec!(0.2),
            price_impact_delta_usd: Decimal::ZERO,
            usd_in: dec!(100),
            usd_out: dec!(99.8),
        }];
        let mut p = params(&steps);
        p.ui_fee_factor = dec!(0.001);
        let fees = get_trade_fees(&p);
        assert_eq!(fees.swap_fees.len(), 1);
        assert_eq!(fees.swap_fees[0].delta_usd, dec!(-0.2));
        assert_eq!(fees.ui_swap_fee.delta_usd, dec!(-0.0998));
        assert_eq!(fees.ui_fee.delta_usd, dec!(-0.5));
    }
}
