//! Conversion to the integer units the order router expects.
//!
//! USD values carry 30 decimals; a token price carries `30 - token decimals` so that
//! `amount * price` lands in 30-decimal USD.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const USD_DECIMALS: u32 = 30;

#[derive(Debug, Error, PartialEq)]
pub enum UnitsError {
    #[error("negative value {0} has no contract representation")]
    Negative(Decimal),
    #[error("{value} overflows {decimals}-decimal contract units")]
    Overflow { value: Decimal, decimals: u32 },
    #[error("token decimals {0} exceed usd decimals")]
    TooManyDecimals(u32),
}

/// An unsigned contract integer; `Max` is `uint256::MAX`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContractUint {
    Value(u128),
    Max,
}

/// `value * 10^decimals`, truncated toward zero.
pub fn to_fixed(value: Decimal, decimals: u32) -> Result<u128, UnitsError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(UnitsError::Negative(value));
    }
    let overflow = || UnitsError::Overflow { value, decimals };
    let mantissa = u128::try_from(value.mantissa()).map_err(|_| overflow())?;
    let scale = value.scale();
    if decimals >= scale {
        let factor = 10u128.checked_pow(decimals - scale).ok_or_else(overflow)?;
        mantissa.checked_mul(factor).ok_or_else(overflow)
    } else {
        let divisor = 10u128.checked_pow(scale - decimals).ok_or_else(overflow)?;
        Ok(mantissa / divisor)
    }
}

pub fn to_contract_usd(usd: Decimal) -> Result<u128, UnitsError> {
    to_fixed(usd, USD_DECIMALS)
}

pub fn to_token_units(amount: Decimal, token_decimals: u32) -> Result<u128, UnitsError> {
    to_fixed(amount, token_decimals)
}

pub fn to_contract_price(price: Decimal, token_decimals: u32) -> Result<u128, UnitsError> {
    let decimals = USD_DECIMALS
        .checked_sub(token_decimals)
        .ok_or(UnitsError::TooManyDecimals(token_decimals))?;
    to_fixed(price, decimals)
}

/// Like [`to_contract_price`], with `Decimal::MAX` standing for the any-price sentinel.
pub fn to_contract_acceptable_price(price: Decimal, token_decimals: u32) -> Result<ContractUint, UnitsError> {
    if price == Decimal::MAX {
        return Ok(ContractUint::Max);
    }
    to_contract_price(price, token_decimals).map(ContractUint::Value)
}
