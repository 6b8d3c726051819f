use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::math::usd_to_tokens;
use crate::price_impact::{price_impact_usd, ImpactCurve, OpenInterest};
use crate::types::TokenInfo;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapStep {
    pub market_address: String,
    pub token_in: String,
    pub token_out: String,
    pub swap_fee_usd: Decimal,
    pub price_impact_delta_usd: Decimal,
    pub usd_in: Decimal,
    pub usd_out: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapPathStats {
    /// Market addresses, in hop order.
    pub swap_path: Vec<String>,
    pub swap_steps: Vec<SwapStep>,
    pub total_swap_fee_usd: Decimal,
    pub total_swap_price_impact_delta_usd: Decimal,
    pub usd_out: Decimal,
}

/// Finds how collateral can be converted into the token the trader wants to receive.
pub trait SwapRouter {
    fn find_swap_path(&self, token_in: &TokenInfo, token_out: &TokenInfo, usd_in: Decimal) -> Option<SwapPathStats>;
    /// USD of `token_out` that can be taken out of the pools when paying with `token_in`.
    fn max_swap_liquidity_usd(&self, token_in: &TokenInfo, token_out: &TokenInfo) -> Decimal;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapAmounts {
    pub amount_in: Decimal,
    pub usd_in: Decimal,
    pub amount_out: Decimal,
    pub usd_out: Decimal,
    pub swap_path_stats: Option<SwapPathStats>,
}

fn routing_address(token: &TokenInfo) -> &str {
    token.wrapped_address.as_deref().unwrap_or(&token.address)
}

/// Same token, or a native token and its wrapped form.
pub fn is_equivalent_tokens(a: &TokenInfo, b: &TokenInfo) -> bool {
    routing_address(a).eq_ignore_ascii_case(routing_address(b))
}

pub fn get_swap_amounts_by_from_value(
    token_in: &TokenInfo,
    token_out: &TokenInfo,
    amount_in: Decimal,
    router: &dyn SwapRouter,
    ui_fee_factor: Decimal,
) -> SwapAmounts {
    let usd_in = amount_in * token_in.prices.min;

    if is_equivalent_tokens(token_in, token_out) {
        return SwapAmounts {
            amount_in,
            usd_in,
            amount_out: amount_in,
            usd_out: usd_in,
            swap_path_stats: None,
        };
    }

    let Some(stats) = router.find_swap_path(token_in, token_out, usd_in) else {
        return SwapAmounts {
            amount_in,
            usd_in,
            amount_out: Decimal::ZERO,
            usd_out: Decimal::ZERO,
            swap_path_stats: None,
        };
    };

    let usd_out = (stats.usd_out - usd_in * ui_fee_factor).max(Decimal::ZERO);
    let amount_out = usd_to_tokens(usd_out, token_out.prices.max).unwrap_or(Decimal::ZERO);
    SwapAmounts { amount_in, usd_in, amount_out, usd_out, swap_path_stats: Some(stats) }
}

/// Swap pool with two tokens; pool sizes are valued in USD.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapMarket {
    pub market_address: String,
    pub long_token: String,
    pub short_token: String,
    pub long_pool_usd: Decimal,
    pub short_pool_usd: Decimal,
    pub swap_fee_factor: Decimal,
    pub swap_impact_factor_positive: Decimal,
    pub swap_impact_factor_negative: Decimal,
    pub swap_impact_exponent: u32,
}

impl SwapMarket {
    fn pools_for(&self, token_in: &str, token_out: &str) -> Option<(Decimal, Decimal, bool)> {
        let long = self.long_token.as_str();
        let short = self.short_token.as_str();
        if long.eq_ignore_ascii_case(token_in) && short.eq_ignore_ascii_case(token_out) {
            Some((self.long_pool_usd, self.short_pool_usd, true))
        } else if short.eq_ignore_ascii_case(token_in) && long.eq_ignore_ascii_case(token_out) {
            Some((self.short_pool_usd, self.long_pool_usd, false))
        } else {
            None
        }
    }
}

/// Single-hop router: a swap goes through the one market that pairs both tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectSwapRouter {
    pub markets: Vec<SwapMarket>,
}

impl DirectSwapRouter {
    pub fn new(markets: Vec<SwapMarket>) -> Self { Self { markets } }

    fn market_for(&self, token_in: &TokenInfo, token_out: &TokenInfo) -> Option<(&SwapMarket, Decimal, Decimal, bool)> {
        let (a, b) = (routing_address(token_in), routing_address(token_out));
        self.markets
            .iter()
            .find_map(|m| m.pools_for(a, b).map(|(pin, pout, in_is_long)| (m, pin, pout, in_is_long)))
    }
}

impl SwapRouter for DirectSwapRouter {
    fn find_swap_path(&self, token_in: &TokenInfo, token_out: &TokenInfo, usd_in: Decimal) -> Option<SwapPathStats> {
        let (market, pool_in, pool_out, in_is_long) = self.market_for(token_in, token_out)?;

        let swap_fee_usd = usd_in * market.swap_fee_factor;
        let amount_after_fee = usd_in - swap_fee_usd;

        let (current, next) = if in_is_long {
            (
                OpenInterest { long_usd: pool_in, short_usd: pool_out },
                OpenInterest { long_usd: pool_in + amount_after_fee, short_usd: (pool_out - amount_after_fee).max(Decimal::ZERO) },
            )
        } else {
            (
                OpenInterest { long_usd: pool_out, short_usd: pool_in },
                OpenInterest { long_usd: (pool_out - amount_after_fee).max(Decimal::ZERO), short_usd: pool_in + amount_after_fee },
            )
        };
        let curve = ImpactCurve {
            exponent: market.swap_impact_exponent,
            positive_factor: market.swap_impact_factor_positive,
            negative_factor: market.swap_impact_factor_negative,
        };
        let (impact_usd, _) = price_impact_usd(&current, &next, &curve)?;
        let usd_out = (amount_after_fee + impact_usd).max(Decimal::ZERO);

        let step = SwapStep {
            market_address: market.market_address.clone(),
            token_in: routing_address(token_in).to_string(),
            token_out: routing_address(token_out).to_string(),
            swap_fee_usd,
            price_impact_delta_usd: impact_usd,
            usd_in,
            usd_out,
        };
        Some(SwapPathStats {
            swap_path: vec![market.market_address.clone()],
            swap_steps: vec![step],
            total_swap_fee_usd: swap_fee_usd,
            total_swap_price_impact_delta_usd: impact_usd,
            usd_out,
        })
    }

    fn max_swap_liquidity_usd(&self, token_in: &TokenInfo, token_out: &TokenInfo) -> Decimal {
        self.market_for(token_in, token_out).map(|(_, _, pool_out, _)| pool_out).unwrap_or(Decimal::ZERO)
    }
}
