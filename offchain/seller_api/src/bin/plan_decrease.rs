use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;

use decrease_engine::position::current_liquidation_price;
use decrease_engine::{
    plan_decrease, DecreaseParams, DecreasePlan, MarketInfo, OrderMode, Position, PriceRange, Side, TokenInfo,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg { Long, Short }

#[derive(Parser, Debug)]
#[command(name = "plan-decrease", about = "Print the close plan for a position as JSON")]
struct Args {
    #[arg(long, value_enum)]
    side: SideArg,
    #[arg(long)]
    size_usd: Decimal,
    /// Collateral in USD; valued as a 1 USD stable token.
    #[arg(long)]
    collateral_usd: Decimal,
    #[arg(long)]
    entry_price: Decimal,
    #[arg(long)]
    mark_price: Decimal,
    #[arg(long)]
    close_usd: Decimal,
    #[arg(long)]
    trigger_price: Option<Decimal>,
    #[arg(long, default_value_t = 30)]
    slippage_bps: u32,
    #[arg(long)]
    keep_leverage: bool,
    #[arg(long, default_value = "1")]
    min_collateral_usd: Decimal,
    /// Market parameters as JSON; defaults to a balanced market without price impact.
    #[arg(long)]
    market_json: Option<String>,
}

#[derive(Serialize)]
struct Output {
    liquidation_price: Option<Decimal>,
    plan: DecreasePlan,
}

fn token(symbol: &str, decimals: u32, price: Decimal) -> TokenInfo {
    TokenInfo {
        address: symbol.to_lowercase(),
        symbol: symbol.to_string(),
        decimals,
        prices: PriceRange::flat(price),
        wrapped_address: None,
        is_native: false,
    }
}

fn default_market(index: TokenInfo) -> MarketInfo {
    MarketInfo {
        market_address: "market".into(),
        long_token_address: index.address.clone(),
        short_token_address: "usd".into(),
        index_token: index,
        long_interest_usd: Decimal::ZERO,
        short_interest_usd: Decimal::ZERO,
        position_fee_factor_positive_impact: Decimal::new(5, 4),
        position_fee_factor_negative_impact: Decimal::new(7, 4),
        position_impact_factor_positive: Decimal::ZERO,
        position_impact_factor_negative: Decimal::ZERO,
        max_position_impact_factor_positive: Decimal::ZERO,
        max_position_impact_factor_negative: Decimal::ZERO,
        position_impact_exponent: 2,
        swap_fee_factor: Decimal::new(5, 4),
        min_collateral_factor: Decimal::new(1, 2),
        max_leverage: Decimal::from(100),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.entry_price <= Decimal::ZERO {
        return Err(anyhow!("entry price must be positive"));
    }

    let index = token("INDEX", 18, args.mark_price);
    let market = match &args.market_json {
        Some(raw) => serde_json::from_str::<MarketInfo>(raw)?,
        None => default_market(index.clone()),
    };
    let position = Position {
        key: "cli".into(),
        market_address: market.market_address.clone(),
        index_token: index,
        collateral_token: token("USD", 6, Decimal::ONE),
        side: match args.side {
            SideArg::Long => Side::Long,
            SideArg::Short => Side::Short,
        },
        size_usd: args.size_usd,
        size_in_tokens: args.size_usd / args.entry_price,
        collateral_amount: args.collateral_usd,
        entry_price: args.entry_price,
        pending_borrowing_fees_usd: Decimal::ZERO,
        pending_funding_fees_usd: Decimal::ZERO,
    };

    let mut params = DecreaseParams::market(&position, &market, args.close_usd, args.slippage_bps);
    params.keep_leverage = args.keep_leverage;
    if args.trigger_price.is_some() {
        params.order_mode = OrderMode::Trigger;
        params.trigger_price = args.trigger_price;
    }

    let plan = plan_decrease(&params, args.min_collateral_usd).ok_or_else(|| anyhow!("plan is not computable for these inputs"))?;
    let out = Output {
        liquidation_price: current_liquidation_price(&position, &market, args.min_collateral_usd),
        plan,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
