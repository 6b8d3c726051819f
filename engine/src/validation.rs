use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fees::TradeFees;
use crate::position::NextPositionValues;
use crate::types::{MarketInfo, Position, Side};

pub const DEFAULT_EXCESSIVE_SLIPPAGE_BPS: u32 = 200;
pub const DEFAULT_HIGH_PRICE_IMPACT_BPS: u32 = 50;

/// User-correctable conditions that block a close. Only the first one found is shown.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TradeError {
    #[error("Connect wallet")]
    WalletNotConnected,
    #[error("Page outdated, please refresh")]
    OutdatedUi,
    #[error("Slippage is too high")]
    ExcessiveSlippage,
    #[error("Enter a size")]
    EmptySize,
    #[error("Enter a trigger price")]
    EmptyTriggerPrice,
    #[error("Trigger price below liq. price")]
    TriggerBelowLiqPrice,
    #[error("Trigger price above liq. price")]
    TriggerAboveLiqPrice,
    #[error("Max close amount exceeded")]
    MaxCloseAmountExceeded,
    #[error("Max leverage: {0}x")]
    MaxLeverageExceeded(Decimal),
    #[error("Leftover collateral below {0} USD")]
    LeftoverCollateralBelowMin(Decimal),
    #[error("Leftover position below {0} USD")]
    LeftoverPositionBelowMin(Decimal),
    #[error("Invalid liq. price")]
    InvalidLiqPrice,
    #[error("Insufficient receive token liquidity")]
    InsufficientReceiveTokenLiquidity,
    #[error("Acknowledgment required")]
    PriceImpactNotAcknowledged,
}

#[derive(Debug, Clone, Copy)]
pub struct CommonErrorParams {
    pub is_connected: bool,
    pub has_outdated_ui: bool,
    pub allowed_slippage_bps: u32,
    pub excessive_slippage_bps: u32,
}

pub fn get_common_error(p: &CommonErrorParams) -> Option<TradeError> {
    if !p.is_connected {
        return Some(TradeError::WalletNotConnected);
    }
    if p.has_outdated_ui {
        return Some(TradeError::OutdatedUi);
    }
    if p.allowed_slippage_bps > p.excessive_slippage_bps {
        return Some(TradeError::ExcessiveSlippage);
    }
    None
}

/// Acknowledgment gate for large adverse price impact; each leg is accepted separately.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceImpactWarning {
    pub is_high_position_impact: bool,
    pub is_high_swap_impact: bool,
    pub is_high_position_impact_accepted: bool,
    pub is_high_swap_impact_accepted: bool,
}

impl PriceImpactWarning {
    pub fn from_fees(
        fees: Option<&TradeFees>,
        threshold_bps: u32,
        position_impact_accepted: bool,
        swap_impact_accepted: bool,
    ) -> Self {
        let threshold = Decimal::from(threshold_bps);
        let is_high = |delta_usd: Decimal, bps: Decimal| delta_usd < Decimal::ZERO && bps.abs() >= threshold;
        let (is_high_position_impact, is_high_swap_impact) = match fees {
            Some(f) => (
                is_high(f.position_price_impact.delta_usd, f.position_price_impact.bps),
                is_high(f.swap_price_impact.delta_usd, f.swap_price_impact.bps),
            ),
            None => (false, false),
        };
        Self {
            is_high_position_impact,
            is_high_swap_impact,
            is_high_position_impact_accepted: position_impact_accepted,
            is_high_swap_impact_accepted: swap_impact_accepted,
        }
    }

    pub fn should_show_warning(&self) -> bool {
        self.is_high_position_impact || self.is_high_swap_impact
    }

    /// True while some high-impact leg is still unacknowledged.
    pub fn blocks_submit(&self) -> bool {
        (self.is_high_position_impact && !self.is_high_position_impact_accepted)
            || (self.is_high_swap_impact && !self.is_high_swap_impact_accepted)
    }
}

#[derive(Debug, Clone)]
pub struct DecreaseErrorParams<'a> {
    pub market: &'a MarketInfo,
    pub position: &'a Position,
    pub input_size_usd: Decimal,
    /// Absent while the plan is not computable.
    pub size_delta_usd: Option<Decimal>,
    pub is_trigger: bool,
    pub trigger_price: Option<Decimal>,
    pub mark_price: Option<Decimal>,
    pub liquidation_price: Option<Decimal>,
    pub next_position_values: Option<&'a NextPositionValues>,
    pub is_full_close: bool,
    pub min_collateral_usd: Decimal,
    pub min_position_size_usd: Decimal,
    pub price_impact_warning: PriceImpactWarning,
    pub is_not_enough_receive_token_liquidity: bool,
}

pub fn get_decrease_error(p: &DecreaseErrorParams<'_>) -> Option<TradeError> {
    let size_delta_usd = p.size_delta_usd.unwrap_or(Decimal::ZERO);
    if p.input_size_usd <= Decimal::ZERO || size_delta_usd <= Decimal::ZERO {
        return Some(TradeError::EmptySize);
    }

    if p.is_trigger {
        let Some(trigger_price) = p.trigger_price.filter(|t| *t > Decimal::ZERO) else {
            return Some(TradeError::EmptyTriggerPrice);
        };
        if let Some(liq) = p.liquidation_price {
            match p.position.side {
                Side::Long if trigger_price <= liq => return Some(TradeError::TriggerBelowLiqPrice),
                Side::Short if trigger_price >= liq => return Some(TradeError::TriggerAboveLiqPrice),
                _ => {}
            }
        }
    }

    if p.input_size_usd > p.position.size_usd {
        return Some(TradeError::MaxCloseAmountExceeded);
    }

    if let Some(next) = p.next_position_values.filter(|_| !p.is_full_close) {
        if next.next_leverage.is_some_and(|l| l > p.market.max_leverage) {
            return Some(TradeError::MaxLeverageExceeded(p.market.max_leverage));
        }
        if next.next_collateral_usd <= p.min_collateral_usd {
            return Some(TradeError::LeftoverCollateralBelowMin(p.min_collateral_usd));
        }
        if next.next_size_usd < p.min_position_size_usd {
            return Some(TradeError::LeftoverPositionBelowMin(p.min_position_size_usd));
        }
        if !p.is_trigger {
            if let (Some(liq), Some(mark)) = (next.next_liq_price, p.mark_price) {
                let beyond_mark = match p.position.side {
                    Side::Long => liq >= mark,
                    Side::Short => liq <= mark,
                };
                if beyond_mark {
                    return Some(TradeError::InvalidLiqPrice);
                }
            }
        }
    }

    if p.is_not_enough_receive_token_liquidity {
        return Some(TradeError::InsufficientReceiveTokenLiquidity);
    }

    if p.price_impact_warning.blocks_submit() {
        return Some(TradeError::PriceImpactNotAcknowledged);
    }

    None
}

/// Common errors win over decrease errors.
pub fn first_error(common: Option<TradeError>, decrease: Option<TradeError>) -> Option<TradeError> {
    common.or(decrease)
}

/// The server publishes the minimum client version as a decimal string; anything unparsable is
/// treated as up to date.
pub fn has_outdated_ui(remote_version: Option<&str>, local_version: &str) -> bool {
    let parse = |s: &str| Decimal::from_str(s.trim()).ok();
    match (remote_version.and_then(parse), parse(local_version)) {
        (Some(remote), Some(local)) => remote > local,
        _ => false,
    }
}
