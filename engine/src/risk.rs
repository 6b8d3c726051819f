use rust_decimal::Decimal;

use crate::types::{Position, Side};

/// Absent when the position value at `price` is out of range.
pub fn pnl_usd(side: Side, size_usd: Decimal, size_in_tokens: Decimal, price: Decimal) -> Option<Decimal> {
    let value = size_in_tokens.checked_mul(price)?;
    match side {
        Side::Long => value.checked_sub(size_usd),
        Side::Short => size_usd.checked_sub(value),
    }
}

pub fn position_pnl(pos: &Position, price: Decimal) -> Option<Decimal> {
    pnl_usd(pos.side, pos.size_usd, pos.size_in_tokens, price)
}

/// `size / (collateral - pending fees)`, absent when nothing is left to back the position.
pub fn leverage(size_usd: Decimal, collateral_usd: Decimal, pending_fees_usd: Decimal) -> Option<Decimal> {
    let remaining = collateral_usd - pending_fees_usd;
    if remaining <= Decimal::ZERO {
        return None;
    }
    Some(size_usd / remaining)
}

pub fn position_leverage(pos: &Position) -> Option<Decimal> {
    leverage(pos.size_usd, pos.collateral_usd(), pos.pending_fees_usd())
}

#[derive(Debug, Clone, Copy)]
pub struct LiquidationParams {
    pub side: Side,
    pub size_usd: Decimal,
    pub size_in_tokens: Decimal,
    pub collateral_usd: Decimal,
    pub pending_fees_usd: Decimal,
    pub closing_fee_usd: Decimal,
    pub min_collateral_factor: Decimal,
    pub min_collateral_usd: Decimal,
}

pub fn liquidation_price(p: &LiquidationParams) -> Option<Decimal> {
    if p.size_usd <= Decimal::ZERO || p.size_in_tokens <= Decimal::ZERO {
        return None;
    }
    let liquidation_collateral_usd = (p.size_usd * p.min_collateral_factor).max(p.min_collateral_usd);
    let remaining_collateral_usd = p.collateral_usd - p.pending_fees_usd - p.closing_fee_usd;

    let price = match p.side {
        Side::Long => (liquidation_collateral_usd - remaining_collateral_usd + p.size_usd) / p.size_in_tokens,
        Side::Short => (p.size_usd + remaining_collateral_usd - liquidation_collateral_usd) / p.size_in_tokens,
    };
    if price <= Decimal::ZERO {
        return None;
    }
    Some(price)
}

/// Remaining collateral after withdrawing `collateral_delta_usd` and absorbing a realized loss
/// must still back `next_size_usd` at the market's min collateral factor.
pub fn will_position_collateral_be_sufficient(
    pos: &Position,
    collateral_delta_usd: Decimal,
    realized_pnl_usd: Decimal,
    next_size_usd: Decimal,
    min_collateral_factor: Decimal,
) -> bool {
    let mut remaining = pos.collateral_usd() - collateral_delta_usd;
    if realized_pnl_usd < Decimal::ZERO {
        remaining += realized_pnl_usd;
    }
    remaining >= Decimal::ZERO && remaining >= next_size_usd * min_collateral_factor
}
