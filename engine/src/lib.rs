//! Close-position planning for perpetual positions: acceptable prices, fees, price impact,
//! PnL, the post-trade projection and the checks that gate submission. No I/O.

pub mod decrease;
pub mod fees;
pub mod gas;
pub mod math;
pub mod position;
pub mod price_impact;
pub mod risk;
pub mod swap;
pub mod types;
pub mod units;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use decrease::{compute_decrease_amounts, DecreaseAmounts, DecreaseParams};
pub use fees::{get_trade_fees, TradeFees, TradeFeesParams};
pub use gas::{ExecutionFee, ExecutionFeeMultipliers, GasLimits};
pub use position::{compute_next_position_values, plan_decrease, DecreasePlan, NextPositionValues};
pub use swap::{DirectSwapRouter, SwapAmounts, SwapMarket, SwapRouter};
pub use types::*;
pub use units::{ContractUint, UnitsError};
pub use validation::{PriceImpactWarning, TradeError};
