use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ARBITRUM: ChainId = ChainId(42_161);
    pub const ARBITRUM_GOERLI: ChainId = ChainId(421_613);
    pub const AVALANCHE: ChainId = ChainId(43_114);
    pub const AVALANCHE_FUJI: ChainId = ChainId(43_113);
    pub const HARMONY: ChainId = ChainId(1_666_600_000);
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side { Long, Short }

impl Side {
    pub fn is_long(&self) -> bool { matches!(self, Side::Long) }
}

/// Oracle min/max prices, USD per whole token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceRange {
    pub fn flat(price: Decimal) -> Self { Self { min: price, max: price } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
    pub decimals: u32,
    pub prices: PriceRange,
    /// Address of the wrapped form for native tokens (ETH -> WETH).
    #[serde(default)]
    pub wrapped_address: Option<String>,
    #[serde(default)]
    pub is_native: bool,
}

/// Market parameters read from the chain. Factors are plain fractions (0.0005 = 5 bps).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketInfo {
    pub market_address: String,
    pub index_token: TokenInfo,
    pub long_token_address: String,
    pub short_token_address: String,
    pub long_interest_usd: Decimal,
    pub short_interest_usd: Decimal,
    pub position_fee_factor_positive_impact: Decimal,
    pub position_fee_factor_negative_impact: Decimal,
    pub position_impact_factor_positive: Decimal,
    pub position_impact_factor_negative: Decimal,
    pub max_position_impact_factor_positive: Decimal,
    pub max_position_impact_factor_negative: Decimal,
    pub position_impact_exponent: u32,
    /// Charged when realized profit is swapped from the PnL token into the collateral token.
    pub swap_fee_factor: Decimal,
    pub min_collateral_factor: Decimal,
    /// Max leverage allowed by the market, e.g. 100 for 100x.
    pub max_leverage: Decimal,
}

impl MarketInfo {
    pub fn pnl_token_address(&self, side: Side) -> &str {
        match side {
            Side::Long => &self.long_token_address,
            Side::Short => &self.short_token_address,
        }
    }
}

/// Read-only snapshot of an open position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub key: String,
    pub market_address: String,
    pub index_token: TokenInfo,
    pub collateral_token: TokenInfo,
    pub side: Side,
    pub size_usd: Decimal,
    pub size_in_tokens: Decimal,
    pub collateral_amount: Decimal, // collateral token units
    pub entry_price: Decimal,
    #[serde(default)]
    pub pending_borrowing_fees_usd: Decimal,
    #[serde(default)]
    pub pending_funding_fees_usd: Decimal,
}

impl Position {
    pub fn is_long(&self) -> bool { self.side.is_long() }

    /// Collateral valued at the collateral token's min price.
    pub fn collateral_usd(&self) -> Decimal {
        self.collateral_amount * self.collateral_token.prices.min
    }

    pub fn pending_fees_usd(&self) -> Decimal {
        self.pending_borrowing_fees_usd + self.pending_funding_fees_usd
    }
}

/// Closed set of order modes offered by the close dialog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OrderMode {
    #[default]
    Market,
    Trigger,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecreaseOrderType {
    MarketDecrease,
    /// Take-profit.
    LimitDecrease,
    StopLossDecrease,
}

impl DecreaseOrderType {
    pub fn trigger_name(&self) -> &'static str {
        match self {
            DecreaseOrderType::MarketDecrease => "Market",
            DecreaseOrderType::LimitDecrease => "Take-Profit",
            DecreaseOrderType::StopLossDecrease => "Stop-Loss",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TriggerThreshold {
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<")]
    Below,
}

impl TriggerThreshold {
    pub fn symbol(&self) -> &'static str {
        match self {
            TriggerThreshold::Above => ">",
            TriggerThreshold::Below => "<",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DecreasePositionSwapType {
    #[default]
    NoSwap,
    SwapPnlTokenToCollateralToken,
    SwapCollateralTokenToPnlToken,
}

/// Referral code and the trader's fee discount (fraction of the position fee).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReferralInfo {
    pub referral_code: Option<String>,
    pub discount_factor: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_threshold_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&TriggerThreshold::Above).unwrap(), "\">\"");
        let t: TriggerThreshold = serde_json::from_str("\"<\"").unwrap();
        assert_eq!(t.symbol(), "<");
    }

    #[test]
    fn position_json_defaults_pending_fees() {
        let raw = r#"{
            "key": "k", "market_address": "0xm",
            "index_token": {"address": "0xweth", "symbol": "WETH", "decimals": 18, "prices": {"min": "2000", "max": "2001"}},
            "collateral_token": {"address": "0xusdc", "symbol": "USDC", "decimals": 6, "prices": {"min": "1", "max": "1"}},
            "side": "Long", "size_usd": "1000", "size_in_tokens": "0.5", "collateral_amount": "100", "entry_price": "2000"
        }"#;
        let pos: Position = serde_json::from_str(raw).unwrap();
        assert!(pos.is_long());
        assert_eq!(pos.pending_fees_usd(), Decimal::ZERO);
        assert_eq!(pos.collateral_usd(), Decimal::from(100));
        assert_eq!(OrderMode::default(), OrderMode::Market);
    }
}
