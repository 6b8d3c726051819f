use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use decrease_engine::{ChainId, GasLimits, MarketInfo, Position, PriceRange, Side, SwapMarket, TokenInfo};

use crate::session::SellerContext;

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

pub(crate) fn eth() -> TokenInfo {
    TokenInfo {
        address: "ETH".into(),
        symbol: "ETH".into(),
        wrapped_address: Some("0xweth".into()),
        is_native: true,
        ..weth()
    }
}

pub(crate) fn market() -> MarketInfo {
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

pub(crate) fn long_position() -> Position {
    Position {
        key: "pos-1".into(),
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

/// Connected account on Arbitrum with gas data and a USDC/WETH swap pool.
pub(crate) fn context() -> SellerContext {
    let mut ctx = SellerContext::new(ChainId::ARBITRUM);
    ctx.account = Some("0xtrader".into());
    ctx.markets = vec![market()];
    ctx.tokens = vec![usdc(), weth()];
    ctx.native_token = Some(eth());
    ctx.swap_markets = vec![SwapMarket {
        market_address: "0xswap".into(),
        long_token: "0xweth".into(),
        short_token: "0xusdc".into(),
        long_pool_usd: dec!(1000000),
        short_pool_usd: dec!(1200000),
        swap_fee_factor: dec!(0.0005),
        swap_impact_factor_positive: dec!(0.0000000001),
        swap_impact_factor_negative: dec!(0.0000000002),
        swap_impact_exponent: 2,
    }];
    ctx.gas_limits = Some(GasLimits {
        decrease_order: 2_000_000,
        single_swap: 1_000_000,
        estimated_fee_base_gas_limit: 500_000,
        estimated_fee_multiplier_factor: dec!(1),
    });
    ctx.gas_price = Some(100_000_000);
    ctx.min_collateral_usd = dec!(1);
    ctx.min_position_size_usd = dec!(10);
    ctx
}
