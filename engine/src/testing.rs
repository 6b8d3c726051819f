//! Fixtures shared by the unit tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::swap::SwapMarket;
use crate::types::{MarketInfo, Position, PriceRange, Side, TokenInfo};

pub(crate) fn usdc() -> TokenInfo {
    TokenInfo {
        address: "0xusdc".into(),
        symbol: "USDC".into(),
        decimals: 6,
        prices: PriceRange::flat(dec!(1)),
        wrapped_address: None,
        is_native: false,
    }
}

pub(crate) fn weth() -> TokenInfo {
    TokenInfo {
        address: "0xweth".into(),
        symbol: "WETH".into(),
        decimals: 18,
        prices: PriceRange::flat(dec!(2000)),
        wrapped_address: None,
        is_native: false,
    }
}

pub(crate) fn eth_native() -> TokenInfo {
    TokenInfo {
        address: "ETH".into(),
        symbol: "ETH".into(),
        decimals: 18,
        prices: PriceRange::flat(dec!(2000)),
        wrapped_address: Some("0xweth".into()),
        is_native: true,
    }
}

/// ETH/USD market, long-heavy, with impact small enough to stay below the caps.
pub(crate) fn eth_market() -> MarketInfo {
    MarketInfo {
        market_address: "0xethusd".into(),
        index_token: weth(),
        long_token_address: "0xweth".into(),
        short_token_address: "0xusdc".into(),
        long_interest_usd: dec!(150000),
        short_interest_usd: dec!(100000),
        position_fee_factor_positive_impact: dec!(0.0005),
        position_fee_factor_negative_impact: dec!(0.0007),
        position_impact_factor_positive: dec!(0.0000000001),
        position_impact_factor_negative: dec!(0.0000000002),
        max_position_impact_factor_positive: dec!(0.005),
        max_position_impact_factor_negative: dec!(0.005),
        position_impact_exponent: 2,
        swap_fee_factor: dec!(0.0005),
        min_collateral_factor: dec!(0.01),
        max_leverage: dec!(100),
    }
}

/// 10x long: 1000 USD of ETH entered at 2000, backed by 100 USDC.
pub(crate) fn long_eth_position() -> Position {
    Position {
        key: "pos-long-eth".into(),
        market_address: "0xethusd".into(),
        index_token: weth(),
        collateral_token: usdc(),
        side: Side::Long,
        size_usd: dec!(1000),
        size_in_tokens: dec!(0.5),
        collateral_amount: dec!(100),
        entry_price: dec!(2000),
        pending_borrowing_fees_usd: Decimal::ZERO,
        pending_funding_fees_usd: Decimal::ZERO,
    }
}

pub(crate) fn short_eth_position() -> Position {
    Position { key: "pos-short-eth".into(), side: Side::Short, ..long_eth_position() }
}

pub(crate) fn usdc_weth_swap_market() -> SwapMarket {
    SwapMarket {
        market_address: "0xswap".into(),
        long_token: "0xweth".into(),
        short_token: "0xusdc".into(),
        long_pool_usd: dec!(1000000),
        short_pool_usd: dec!(1200000),
        swap_fee_factor: dec!(0.0005),
        swap_impact_factor_positive: dec!(0.0000000001),
        swap_impact_factor_negative: dec!(0.0000000002),
        swap_impact_exponent: 2,
    }
}
