use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ChainId, TokenInfo};

/// Gas limits published by the protocol's data store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GasLimits {
    pub decrease_order: u64,
    pub single_swap: u64,
    pub estimated_fee_base_gas_limit: u64,
    pub estimated_fee_multiplier_factor: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionFee {
    pub fee_token_amount: u128, // wei
    pub fee_usd: Decimal,
    pub fee_token_symbol: String,
    pub is_fee_high: bool,
}

pub const DEFAULT_HIGH_EXECUTION_FEE_USD: u32 = 3;

const HIGH_EXECUTION_FEES_USD: &[(ChainId, u32)] = &[
    (ChainId::ARBITRUM, 3),
    (ChainId::AVALANCHE, 3),
    (ChainId::AVALANCHE_FUJI, 3),
];

pub fn high_execution_fee_usd(chain: ChainId) -> Decimal {
    let usd = HIGH_EXECUTION_FEES_USD
        .iter()
        .find(|(c, _)| *c == chain)
        .map(|(_, usd)| *usd)
        .unwrap_or(DEFAULT_HIGH_EXECUTION_FEE_USD);
    Decimal::from(usd)
}

pub fn estimate_execute_decrease_order_gas_limit(gas_limits: &GasLimits, swaps_count: u64) -> u64 {
    gas_limits.decrease_order + gas_limits.single_swap * swaps_count
}

/// Fee in the native token for `estimated_gas_limit`, valued at the native token's min price.
pub fn get_execution_fee(
    chain: ChainId,
    gas_limits: &GasLimits,
    native_token: &TokenInfo,
    estimated_gas_limit: u64,
    gas_price: u128,
) -> Option<ExecutionFee> {
    let multiplied = Decimal::from(estimated_gas_limit) * gas_limits.estimated_fee_multiplier_factor;
    let adjusted_gas_limit = u128::from(gas_limits.estimated_fee_base_gas_limit) + u128_floor(multiplied)?;
    let fee_token_amount = adjusted_gas_limit.checked_mul(gas_price)?;
    Some(execution_fee_from_amount(chain, native_token, fee_token_amount))
}

pub fn execution_fee_from_amount(chain: ChainId, native_token: &TokenInfo, fee_token_amount: u128) -> ExecutionFee {
    let fee_usd = wei_to_tokens(fee_token_amount, native_token.decimals)
        .map(|amount| amount * native_token.prices.min)
        .unwrap_or(Decimal::MAX);
    ExecutionFee {
        fee_token_amount,
        fee_usd,
        fee_token_symbol: native_token.symbol.clone(),
        is_fee_high: fee_usd > high_execution_fee_usd(chain),
    }
}

fn u128_floor(value: Decimal) -> Option<u128> {
    use rust_decimal::prelude::ToPrimitive;
    value.floor().to_u128()
}

fn wei_to_tokens(amount: u128, decimals: u32) -> Option<Decimal> {
    let mut out = Decimal::from_u128(amount)?;
    out.set_scale(decimals).ok()?;
    Some(out.normalize())
}

/// Per-chain gas multipliers used to floor the router's minimum execution fee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionFeeMultipliers {
    pub entries: Vec<(ChainId, u128)>,
}

impl Default for ExecutionFeeMultipliers {
    fn default() -> Self {
        Self {
            entries: vec![
                (ChainId::HARMONY, 2_150_000),
                (ChainId::ARBITRUM, 2_150_000),
                (ChainId::ARBITRUM_GOERLI, 2_150_000),
                // average gas usage on Avalanche
                (ChainId::AVALANCHE, 700_000),
            ],
        }
    }
}

impl ExecutionFeeMultipliers {
    pub fn multiplier(&self, chain: ChainId) -> Option<u128> {
        self.entries.iter().find(|(c, _)| *c == chain).map(|(_, m)| *m)
    }

    /// `max(min_execution_fee, gas_price * multiplier)`; chains without a multiplier keep the minimum.
    pub fn final_execution_fee(&self, chain: ChainId, min_execution_fee: u128, gas_price: Option<u128>) -> u128 {
        let estimated = match (gas_price, self.multiplier(chain)) {
            (Some(price), Some(multiplier)) => price.saturating_mul(multiplier),
            _ => return min_execution_fee,
        };
        estimated.max(min_execution_fee)
    }
}
