use rust_decimal::Decimal;

use crate::types::{PriceRange, Side};

pub const BASIS_POINTS_DIVISOR: u32 = 10_000;

pub fn bps_to_factor(bps: u32) -> Decimal {
    Decimal::from(bps) / Decimal::from(BASIS_POINTS_DIVISOR)
}

/// `value / basis` expressed in bps; zero basis gives zero, an out-of-range ratio saturates.
pub fn to_bps(value: Decimal, basis: Decimal) -> Decimal {
    if basis.is_zero() {
        return Decimal::ZERO;
    }
    let divisor = Decimal::from(BASIS_POINTS_DIVISOR);
    value
        .checked_mul(divisor)
        .and_then(|scaled| scaled.checked_div(basis))
        .or_else(|| value.checked_div(basis)?.checked_mul(divisor))
        .unwrap_or(if value.is_sign_negative() == basis.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        })
}

/// Price used to value a decrease: the side that is worse for the trader.
pub fn mark_price_for_decrease(prices: &PriceRange, side: Side) -> Decimal {
    match side {
        Side::Long => prices.min,
        Side::Short => prices.max,
    }
}

/// Moves `price` against the trader by `slippage_bps`.
///
/// Closing a long sells, so the worst tolerated price is lower; closing a short buys back,
/// so it is higher. For increases the directions flip. Absent when the result is out of range.
pub fn apply_slippage_to_price(slippage_bps: u32, price: Decimal, is_increase: bool, side: Side) -> Option<Decimal> {
    let factor = bps_to_factor(slippage_bps);
    let push_up = is_increase == side.is_long();
    if push_up {
        price.checked_mul(Decimal::ONE + factor)
    } else {
        price.checked_mul(Decimal::ONE - factor)
    }
}

pub fn usd_to_tokens(usd: Decimal, price: Decimal) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }
    Some(usd / price)
}

/// `x^exp` for small integer exponents.
pub fn pow_int(x: Decimal, exp: u32) -> Option<Decimal> {
    let mut out = Decimal::ONE;
    for _ in 0..exp {
        out = out.checked_mul(x)?;
    }
    Some(out)
}
