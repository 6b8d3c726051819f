use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fees::{fee_discount_usd, position_fee_usd};
use crate::math::{apply_slippage_to_price, mark_price_for_decrease, to_bps, usd_to_tokens};
use crate::price_impact::position_price_impact_for_decrease;
use crate::risk::position_pnl;
use crate::types::{
    DecreaseOrderType, DecreasePositionSwapType, MarketInfo, OrderMode, Position, ReferralInfo, Side,
    TriggerThreshold,
};

pub const DEFAULT_ACCEPTABLE_PRICE_IMPACT_BUFFER_BPS: u32 = 30;

/// Everything a close plan depends on. Built fresh by the caller on every input change.
#[derive(Debug, Clone)]
pub struct DecreaseParams<'a> {
    pub position: &'a Position,
    pub market: &'a MarketInfo,
    pub close_size_usd: Decimal,
    pub order_mode: OrderMode,
    pub trigger_price: Option<Decimal>,
    pub keep_leverage: bool,
    pub allowed_slippage_bps: u32,
    /// User override of the take-profit tolerance; the recommendation is used when absent.
    pub selected_acceptable_price_impact_bps: Option<u32>,
    pub acceptable_price_impact_buffer_bps: u32,
    pub referral: Option<&'a ReferralInfo>,
    pub ui_fee_factor: Decimal,
}

impl<'a> DecreaseParams<'a> {
    pub fn market(position: &'a Position, market: &'a MarketInfo, close_size_usd: Decimal, allowed_slippage_bps: u32) -> Self {
        Self {
            position,
            market,
            close_size_usd,
            order_mode: OrderMode::Market,
            trigger_price: None,
            keep_leverage: false,
            allowed_slippage_bps,
            selected_acceptable_price_impact_bps: None,
            acceptable_price_impact_buffer_bps: DEFAULT_ACCEPTABLE_PRICE_IMPACT_BUFFER_BPS,
            referral: None,
            ui_fee_factor: Decimal::ZERO,
        }
    }

    pub fn with_keep_leverage(&self, keep_leverage: bool) -> Self {
        Self { keep_leverage, ..self.clone() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecreaseAmounts {
    pub is_full_close: bool,
    pub size_delta_usd: Decimal,
    pub size_delta_in_tokens: Decimal,
    pub collateral_delta_usd: Decimal,
    pub collateral_delta_amount: Decimal,

    pub mark_price: Decimal,
    /// Price the PnL is valued at: the trigger price for trigger orders, else the mark price.
    pub index_price: Decimal,
    pub trigger_price: Option<Decimal>,
    /// Absent for a trigger order without a usable trigger price.
    pub acceptable_price: Option<Decimal>,
    pub recommended_acceptable_price_delta_bps: u32,
    pub acceptable_price_delta_bps: u32,
    pub trigger_order_type: Option<DecreaseOrderType>,
    pub trigger_threshold: Option<TriggerThreshold>,

    pub estimated_pnl: Decimal,
    pub estimated_pnl_percentage: Decimal,
    pub realized_pnl: Decimal,

    pub position_fee_usd: Decimal,
    pub fee_discount_usd: Decimal,
    pub ui_fee_usd: Decimal,
    pub borrowing_fee_usd: Decimal,
    pub funding_fee_usd: Decimal,
    pub swap_profit_fee_usd: Decimal,
    pub position_price_impact_delta_usd: Decimal,
    pub price_impact_diff_usd: Decimal,

    pub payed_remaining_collateral_usd: Decimal,
    pub receive_usd: Decimal,
    pub receive_token_amount: Decimal,
    pub decrease_swap_type: DecreasePositionSwapType,
}

impl DecreaseAmounts {
    /// Order type sent to the router for this plan.
    pub fn order_type(&self, mode: OrderMode) -> Option<DecreaseOrderType> {
        match mode {
            OrderMode::Market => Some(DecreaseOrderType::MarketDecrease),
            OrderMode::Trigger => self.trigger_order_type,
        }
    }

    pub fn total_fees_usd(&self) -> Decimal {
        self.position_fee_usd - self.fee_discount_usd
            + self.ui_fee_usd
            + self.borrowing_fee_usd
            + self.funding_fee_usd
            + self.swap_profit_fee_usd
    }
}

/// Take-profit when the trigger is on the profitable side of the mark price, else stop-loss.
pub fn trigger_kind(side: Side, trigger_price: Decimal, mark_price: Decimal) -> (DecreaseOrderType, TriggerThreshold) {
    match side {
        Side::Long if trigger_price > mark_price => (DecreaseOrderType::LimitDecrease, TriggerThreshold::Above),
        Side::Long => (DecreaseOrderType::StopLossDecrease, TriggerThreshold::Below),
        Side::Short if trigger_price < mark_price => (DecreaseOrderType::LimitDecrease, TriggerThreshold::Below),
        Side::Short => (DecreaseOrderType::StopLossDecrease, TriggerThreshold::Above),
    }
}

/// Acceptable price of a stop-loss: executes at any price.
pub fn any_price(side: Side) -> Decimal {
    match side {
        Side::Long => Decimal::ZERO,
        Side::Short => Decimal::MAX,
    }
}

fn recommended_price_delta_bps(price_impact_usd: Decimal, size_delta_usd: Decimal, buffer_bps: u32) -> u32 {
    let adverse_bps = (-to_bps(price_impact_usd, size_delta_usd)).max(Decimal::ZERO);
    adverse_bps.ceil().to_u32().unwrap_or(u32::MAX).saturating_add(buffer_bps)
}

fn decrease_swap_type(pos: &Position, market: &MarketInfo, realized_pnl: Decimal) -> DecreasePositionSwapType {
    let collateral = pos.collateral_token.wrapped_address.as_deref().unwrap_or(&pos.collateral_token.address);
    let pnl_token = market.pnl_token_address(pos.side);
    if realized_pnl > Decimal::ZERO && !pnl_token.eq_ignore_ascii_case(collateral) {
        DecreasePositionSwapType::SwapPnlTokenToCollateralToken
    } else {
        DecreasePositionSwapType::NoSwap
    }
}

/// Plans a decrease of `close_size_usd` (clamped to `[0, size]`).
///
/// Returns `None` when the plan cannot be computed: empty position, missing prices, or values
/// (impact curve, PnL at the trigger price) that overflow.
pub fn compute_decrease_amounts(p: &DecreaseParams<'_>) -> Option<DecreaseAmounts> {
    let pos = p.position;
    let market = p.market;
    if pos.size_usd <= Decimal::ZERO || pos.size_in_tokens <= Decimal::ZERO {
        return None;
    }
    let mark_price = mark_price_for_decrease(&pos.index_token.prices, pos.side);
    let collateral_min_price = pos.collateral_token.prices.min;
    if mark_price <= Decimal::ZERO || collateral_min_price <= Decimal::ZERO {
        return None;
    }

    let size_delta_usd = p.close_size_usd.clamp(Decimal::ZERO, pos.size_usd);
    let is_full_close = size_delta_usd == pos.size_usd;
    let size_delta_in_tokens = if is_full_close {
        pos.size_in_tokens
    } else {
        pos.size_in_tokens * size_delta_usd / pos.size_usd
    };

    let trigger_price = match p.order_mode {
        OrderMode::Market => None,
        OrderMode::Trigger => p.trigger_price.filter(|t| *t > Decimal::ZERO),
    };
    let (trigger_order_type, trigger_threshold) = match trigger_price {
        Some(t) => {
            let (kind, threshold) = trigger_kind(pos.side, t, mark_price);
            (Some(kind), Some(threshold))
        }
        None => (None, None),
    };
    let index_price = trigger_price.unwrap_or(mark_price);

    let impact = position_price_impact_for_decrease(market, pos.side, size_delta_usd)?;
    let recommended_acceptable_price_delta_bps =
        recommended_price_delta_bps(impact.price_impact_usd, size_delta_usd, p.acceptable_price_impact_buffer_bps);
    let acceptable_price_delta_bps = p
        .selected_acceptable_price_impact_bps
        .unwrap_or(recommended_acceptable_price_delta_bps);

    let acceptable_price = match (p.order_mode, trigger_order_type, trigger_price) {
        (OrderMode::Market, _, _) => Some(apply_slippage_to_price(p.allowed_slippage_bps, mark_price, false, pos.side)?),
        (OrderMode::Trigger, Some(DecreaseOrderType::StopLossDecrease), _) => Some(any_price(pos.side)),
        (OrderMode::Trigger, Some(DecreaseOrderType::LimitDecrease), Some(t)) => {
            Some(apply_slippage_to_price(acceptable_price_delta_bps, t, false, pos.side)?)
        }
        (OrderMode::Trigger, _, _) => None,
    };

    let estimated_pnl = position_pnl(pos, index_price)?;
    let realized_pnl = if is_full_close {
        estimated_pnl
    } else {
        estimated_pnl.checked_mul(size_delta_in_tokens)?.checked_div(pos.size_in_tokens)?
    };
    let collateral_usd = pos.collateral_usd();
    let estimated_pnl_percentage = if collateral_usd.is_zero() {
        Decimal::ZERO
    } else {
        estimated_pnl.checked_mul(Decimal::ONE_HUNDRED)?.checked_div(collateral_usd)?
    };

    let position_fee_usd = position_fee_usd(market, size_delta_usd, impact.balance_was_improved);
    let fee_discount_usd = fee_discount_usd(position_fee_usd, p.referral);
    let ui_fee_usd = size_delta_usd * p.ui_fee_factor;
    let closing = size_delta_usd > Decimal::ZERO;
    let borrowing_fee_usd = if closing { pos.pending_borrowing_fees_usd } else { Decimal::ZERO };
    let funding_fee_usd = if closing { pos.pending_funding_fees_usd } else { Decimal::ZERO };
    let decrease_swap_type = decrease_swap_type(pos, market, realized_pnl);
    let swap_profit_fee_usd = match decrease_swap_type {
        DecreasePositionSwapType::SwapPnlTokenToCollateralToken => realized_pnl.checked_mul(market.swap_fee_factor)?,
        _ => Decimal::ZERO,
    };

    let (collateral_delta_usd, collateral_delta_amount) = if is_full_close {
        (collateral_usd, pos.collateral_amount)
    } else if p.keep_leverage && closing {
        let usd = collateral_usd * size_delta_usd / pos.size_usd;
        (usd, usd / collateral_min_price)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let total_fees_usd = position_fee_usd - fee_discount_usd + ui_fee_usd + borrowing_fee_usd + funding_fee_usd;
    let total_fees_usd = total_fees_usd.checked_add(swap_profit_fee_usd)?;
    let receive = collateral_delta_usd
        .checked_add(realized_pnl)?
        .checked_add(impact.price_impact_usd)?
        .checked_sub(total_fees_usd)?;
    let (receive_usd, payed_remaining_collateral_usd) = if receive < Decimal::ZERO {
        (Decimal::ZERO, -receive)
    } else {
        (receive, Decimal::ZERO)
    };
    let receive_token_amount = usd_to_tokens(receive_usd, pos.collateral_token.prices.max).unwrap_or(Decimal::ZERO);

    Some(DecreaseAmounts {
        is_full_close,
        size_delta_usd,
        size_delta_in_tokens,
        collateral_delta_usd,
        collateral_delta_amount,
        mark_price,
        index_price,
        trigger_price,
        acceptable_price,
        recommended_acceptable_price_delta_bps,
        acceptable_price_delta_bps,
        trigger_order_type,
        trigger_threshold,
        estimated_pnl,
        estimated_pnl_percentage,
        realized_pnl,
        position_fee_usd,
        fee_discount_usd,
        ui_fee_usd,
        borrowing_fee_usd,
        funding_fee_usd,
        swap_profit_fee_usd,
        position_price_impact_delta_usd: impact.price_impact_usd,
        price_impact_diff_usd: impact.price_impact_diff_usd,
        payed_remaining_collateral_usd,
        receive_usd,
        receive_token_amount,
        decrease_swap_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eth_market, long_eth_position, short_eth_position};
    use crate::types::PriceRange;
    use rust_decimal_macros::dec;

    #[test]
    fn size_delta_matches_request_across_range() {
        let pos = long_eth_position();
        let market = eth_market();
        for size in [dec!(0), dec!(1), dec!(250), dec!(999.99), dec!(1000)] {
            let amounts = compute_decrease_amounts(&DecreaseParams::market(&pos, &market, size, 30)).unwrap();
            assert_eq!(amounts.size_delta_usd, size);
            assert_eq!(amounts.is_full_close, size == dec!(1000));
        }
    }

    #[test]
    fn oversized_request_is_clamped_to_a_full_close() {
        let pos = long_eth_position();
        let market = eth_market();
        let amounts = compute_decrease_amounts(&DecreaseParams::market(&pos, &market, dec!(5000), 30)).unwrap();
        assert_eq!(amounts.size_delta_usd, dec!(1000));
        assert!(amounts.is_full_close);
        assert_eq!(amounts.collateral_delta_amount, dec!(100));
    }

    #[test]
    fn market_acceptable_price_moves_against_trader() {
        let market = eth_market();
        let long = long_eth_position();
        let a = compute_decrease_amounts(&DecreaseParams::market(&long, &market, dec!(500), 30)).unwrap();
        assert!(a.acceptable_price.unwrap() <= a.mark_price);
        assert_eq!(a.mark_price - a.acceptable_price.unwrap(), a.mark_price * dec!(0.003));

        let short = short_eth_position();
        let b = compute_decrease_amounts(&DecreaseParams::market(&short, &market, dec!(500), 30)).unwrap();
        assert!(b.acceptable_price.unwrap() >= b.mark_price);
        assert_eq!(b.acceptable_price.unwrap() - b.mark_price, b.mark_price * dec!(0.003));
    }

    #[test]
    fn mark_price_is_the_worse_side_of_the_spread() {
        let market = eth_market();
        let mut long = long_eth_position();
        long.index_token.prices = PriceRange { min: dec!(1999), max: dec!(2001) };
        let a = compute_decrease_amounts(&DecreaseParams::market(&long, &market, dec!(500), 30)).unwrap();
        assert_eq!(a.mark_price, dec!(1999));

        let mut short = short_eth_position();
        short.index_token.prices = PriceRange { min: dec!(1999), max: dec!(2001) };
        let b = compute_decrease_amounts(&DecreaseParams::market(&short, &market, dec!(500), 30)).unwrap();
        assert_eq!(b.mark_price, dec!(2001));
    }

    #[test]
    fn half_close_of_a_ten_x_long() {
        let pos = long_eth_position();
        let market = eth_market();
        let a = compute_decrease_amounts(&DecreaseParams::market(&pos, &market, dec!(500), 30)).unwrap();
        assert_eq!(a.size_delta_usd, dec!(500));
        assert_eq!(a.acceptable_price, Some(dec!(2000) * (Decimal::ONE - dec!(0.003))));
        assert!(!a.is_full_close);
        assert_eq!(a.size_delta_in_tokens, dec!(0.25));
        assert_eq!(pos.size_usd - a.size_delta_usd, dec!(500));
        // flat price: nothing realized, collateral stays without keep-leverage
        assert_eq!(a.realized_pnl, Decimal::ZERO);
        assert_eq!(a.collateral_delta_usd, Decimal::ZERO);
        assert_eq!(a.decrease_swap_type, DecreasePositionSwapType::NoSwap);
    }

    #[test]
    fn trigger_subtype_follows_side_and_mark() {
        assert_eq!(trigger_kind(Side::Long, dec!(2100), dec!(2000)), (DecreaseOrderType::LimitDecrease, TriggerThreshold::Above));
        assert_eq!(trigger_kind(Side::Long, dec!(1900), dec!(2000)), (DecreaseOrderType::StopLossDecrease, TriggerThreshold::Below));
        assert_eq!(trigger_kind(Side::Short, dec!(1900), dec!(2000)), (DecreaseOrderType::LimitDecrease, TriggerThreshold::Below));
        assert_eq!(trigger_kind(Side::Short, dec!(2100), dec!(2000)), (DecreaseOrderType::StopLossDecrease, TriggerThreshold::Above));
    }

    #[test]
    fn take_profit_uses_trigger_price_and_tolerance() {
        let pos = long_eth_position();
        let market = eth_market();
        let mut p = DecreaseParams::market(&pos, &market, dec!(500), 30);
        p.order_mode = OrderMode::Trigger;
        p.trigger_price = Some(dec!(2200));
        let a = compute_decrease_amounts(&p).unwrap();
        assert_eq!(a.trigger_order_type, Some(DecreaseOrderType::LimitDecrease));
        assert_eq!(a.order_type(OrderMode::Trigger), Some(DecreaseOrderType::LimitDecrease));
        // closing the heavy side helps the balance: only the buffer is recommended
        assert_eq!(a.recommended_acceptable_price_delta_bps, 30);
        assert_eq!(a.acceptable_price, Some(dec!(2200) * dec!(0.997)));
        // 0.25 ETH * 200 profit per ETH
        assert_eq!(a.realized_pnl, dec!(50));
        assert_eq!(a.estimated_pnl, dec!(100));
        assert_eq!(a.estimated_pnl_percentage, dec!(100));

        p.selected_acceptable_price_impact_bps = Some(100);
        let b = compute_decrease_amounts(&p).unwrap();
        assert_eq!(b.acceptable_price, Some(dec!(2200) * dec!(0.99)));
    }

    #[test]
    fn stop_loss_accepts_any_price() {
        let market = eth_market();
        let long = long_eth_position();
        let mut p = DecreaseParams::market(&long, &market, dec!(500), 30);
        p.order_mode = OrderMode::Trigger;
        p.trigger_price = Some(dec!(1900));
        assert_eq!(compute_decrease_amounts(&p).unwrap().acceptable_price, Some(Decimal::ZERO));

        let short = short_eth_position();
        let mut p = DecreaseParams::market(&short, &market, dec!(500), 30);
        p.order_mode = OrderMode::Trigger;
        p.trigger_price = Some(dec!(2100));
        assert_eq!(compute_decrease_amounts(&p).unwrap().acceptable_price, Some(Decimal::MAX));
    }

    #[test]
    fn trigger_mode_without_price_has_no_acceptable_price() {
        let pos = long_eth_position();
        let market = eth_market();
        let mut p = DecreaseParams::market(&pos, &market, dec!(500), 30);
        p.order_mode = OrderMode::Trigger;
        let a = compute_decrease_amounts(&p).unwrap();
        assert_eq!(a.acceptable_price, None);
        assert_eq!(a.order_type(OrderMode::Trigger), None);
    }

    #[test]
    fn keep_leverage_withdraws_proportional_collateral() {
        let pos = long_eth_position();
        let market = eth_market();
        let p = DecreaseParams::market(&pos, &market, dec!(500), 30).with_keep_leverage(true);
        let a = compute_decrease_amounts(&p).unwrap();
        assert_eq!(a.collateral_delta_usd, dec!(50));
        assert_eq!(a.collateral_delta_amount, dec!(50));
        assert!(a.receive_usd > dec!(49) && a.receive_usd < dec!(50));
    }

    #[test]
    fn loss_beyond_withdrawal_is_paid_from_remaining_collateral() {
        let mut pos = long_eth_position();
        pos.index_token.prices = PriceRange::flat(dec!(1900));
        let market = eth_market();
        let a = compute_decrease_amounts(&DecreaseParams::market(&pos, &market, dec!(500), 30)).unwrap();
        assert_eq!(a.realized_pnl, dec!(-25));
        assert_eq!(a.receive_usd, Decimal::ZERO);
        assert!(a.payed_remaining_collateral_usd > dec!(25));
    }

    #[test]
    fn profit_in_another_token_is_swapped_to_collateral() {
        let mut pos = long_eth_position();
        pos.index_token.prices = PriceRange::flat(dec!(2200));
        let market = eth_market();
        let a = compute_decrease_amounts(&DecreaseParams::market(&pos, &market, dec!(1000), 30)).unwrap();
        assert_eq!(a.decrease_swap_type, DecreasePositionSwapType::SwapPnlTokenToCollateralToken);
        assert_eq!(a.swap_profit_fee_usd, dec!(100) * dec!(0.0005));
    }

    #[test]
    fn referral_discount_and_pending_fees_reduce_receive() {
        let mut pos = long_eth_position();
        pos.pending_borrowing_fees_usd = dec!(1);
        pos.pending_funding_fees_usd = dec!(0.5);
        let market = eth_market();
        let referral = ReferralInfo { referral_code: Some("code".into()), discount_factor: dec!(0.1) };
        let mut p = DecreaseParams::market(&pos, &market, dec!(1000), 30);
        p.referral = Some(&referral);
        let a = compute_decrease_amounts(&p).unwrap();
        assert_eq!(a.position_fee_usd, dec!(0.5));
        assert_eq!(a.fee_discount_usd, dec!(0.05));
        assert_eq!(a.total_fees_usd(), dec!(1.95));
        assert_eq!(a.receive_usd, dec!(100) - dec!(1.95) + a.position_price_impact_delta_usd);
    }

    #[test]
    fn missing_prices_are_not_computable() {
        let mut pos = long_eth_position();
        pos.index_token.prices = PriceRange::flat(Decimal::ZERO);
        let market = eth_market();
        assert!(compute_decrease_amounts(&DecreaseParams::market(&pos, &market, dec!(500), 30)).is_none());
    }

    #[test]
    fn out_of_range_trigger_price_is_not_computable() {
        let pos = long_eth_position();
        let market = eth_market();
        let mut p = DecreaseParams::market(&pos, &market, dec!(500), 30);
        p.order_mode = OrderMode::Trigger;
        for trigger in [dec!(10000000000000000000000000000), Decimal::MAX] {
            p.trigger_price = Some(trigger);
            assert!(compute_decrease_amounts(&p).is_none());
        }

        let short = short_eth_position();
        let mut p = DecreaseParams::market(&short, &market, dec!(500), 30);
        p.order_mode = OrderMode::Trigger;
        p.trigger_price = Some(Decimal::MAX);
        assert!(compute_decrease_amounts(&p).is_none());
    }
}
