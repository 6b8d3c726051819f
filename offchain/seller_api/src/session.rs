use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use decrease_engine::gas::ExecutionFeeMultipliers;
use decrease_engine::{ChainId, GasLimits, MarketInfo, OrderMode, Position, ReferralInfo, SwapMarket, TokenInfo};

use crate::submitter::Subaccount;

/// What the trader typed into the close dialog. Reset as a whole when the dialog closes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecreaseRequest {
    pub close_usd: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    pub order_mode: OrderMode,
    /// Defaults to the collateral token when absent.
    pub receive_token_address: Option<String>,
    pub selected_trigger_acceptable_price_impact_bps: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acknowledgments {
    pub high_position_impact: bool,
    pub high_swap_impact: bool,
}

/// Per-dialog state. Keep-leverage and slippage are trader preferences and survive a reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellerSession {
    position: Option<Position>,
    request: DecreaseRequest,
    acknowledgments: Acknowledgments,
    keep_leverage: bool,
    allowed_slippage_bps: u32,
}

impl SellerSession {
    pub fn new(allowed_slippage_bps: u32) -> Self {
        Self {
            position: None,
            request: DecreaseRequest::default(),
            acknowledgments: Acknowledgments::default(),
            keep_leverage: true,
            allowed_slippage_bps,
        }
    }

    pub fn position(&self) -> Option<&Position> { self.position.as_ref() }
    pub fn request(&self) -> &DecreaseRequest { &self.request }
    pub fn acknowledgments(&self) -> Acknowledgments { self.acknowledgments }
    pub fn keep_leverage(&self) -> bool { self.keep_leverage }
    pub fn allowed_slippage_bps(&self) -> u32 { self.allowed_slippage_bps }
    pub fn is_open(&self) -> bool { self.position.is_some() }

    /// Selecting another position, or none, starts from a blank request.
    pub fn select_position(&mut self, position: Option<Position>) {
        let same = match (&self.position, &position) {
            (Some(a), Some(b)) => a.key == b.key,
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.reset();
        }
        self.position = position;
    }

    /// Refreshes the snapshot of the selected position without touching the request.
    pub fn refresh_position(&mut self, position: Position) -> bool {
        match &self.position {
            Some(current) if current.key == position.key => {
                self.position = Some(position);
                true
            }
            _ => false,
        }
    }

    pub fn close(&mut self) {
        self.select_position(None);
    }

    fn reset(&mut self) {
        self.request = DecreaseRequest::default();
        self.acknowledgments = Acknowledgments::default();
    }

    pub fn set_close_usd(&mut self, close_usd: Option<Decimal>) { self.request.close_usd = close_usd; }
    pub fn set_trigger_price(&mut self, trigger_price: Option<Decimal>) { self.request.trigger_price = trigger_price; }
    pub fn set_receive_token(&mut self, address: Option<String>) { self.request.receive_token_address = address; }
    pub fn set_keep_leverage(&mut self, keep_leverage: bool) { self.keep_leverage = keep_leverage; }
    pub fn set_allowed_slippage_bps(&mut self, bps: u32) { self.allowed_slippage_bps = bps; }

    pub fn set_selected_trigger_acceptable_price_impact_bps(&mut self, bps: Option<u32>) {
        self.request.selected_trigger_acceptable_price_impact_bps = bps;
    }

    pub fn set_order_mode(&mut self, mode: OrderMode) {
        if self.request.order_mode != mode {
            self.acknowledgments = Acknowledgments::default();
        }
        self.request.order_mode = mode;
    }

    pub fn accept_high_position_impact(&mut self, accepted: bool) { self.acknowledgments.high_position_impact = accepted; }
    pub fn accept_high_swap_impact(&mut self, accepted: bool) { self.acknowledgments.high_swap_impact = accepted; }

    pub fn apply(&mut self, patch: RequestPatch) {
        if let Some(v) = patch.close_usd { self.set_close_usd(v); }
        if let Some(v) = patch.trigger_price { self.set_trigger_price(v); }
        if let Some(v) = patch.order_mode { self.set_order_mode(v); }
        if let Some(v) = patch.receive_token_address { self.set_receive_token(v); }
        if let Some(v) = patch.keep_leverage { self.set_keep_leverage(v); }
        if let Some(v) = patch.allowed_slippage_bps { self.set_allowed_slippage_bps(v); }
        if let Some(v) = patch.selected_trigger_acceptable_price_impact_bps {
            self.set_selected_trigger_acceptable_price_impact_bps(v);
        }
        if let Some(v) = patch.accept_high_position_impact { self.accept_high_position_impact(v); }
        if let Some(v) = patch.accept_high_swap_impact { self.accept_high_swap_impact(v); }
    }
}

/// Partial update of the request; an outer `None` leaves the field alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestPatch {
    #[serde(default, with = "double_option")]
    pub close_usd: Option<Option<Decimal>>,
    #[serde(default, with = "double_option")]
    pub trigger_price: Option<Option<Decimal>>,
    pub order_mode: Option<OrderMode>,
    #[serde(default, with = "double_option")]
    pub receive_token_address: Option<Option<String>>,
    pub keep_leverage: Option<bool>,
    pub allowed_slippage_bps: Option<u32>,
    #[serde(default, with = "double_option")]
    pub selected_trigger_acceptable_price_impact_bps: Option<Option<u32>>,
    pub accept_high_position_impact: Option<bool>,
    pub accept_high_swap_impact: Option<bool>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Chain and account state the dialog reads. Replaced wholesale by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerContext {
    pub chain_id: ChainId,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub subaccount: Option<Subaccount>,
    #[serde(default)]
    pub markets: Vec<MarketInfo>,
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
    #[serde(default)]
    pub native_token: Option<TokenInfo>,
    #[serde(default)]
    pub swap_markets: Vec<SwapMarket>,
    #[serde(default)]
    pub gas_limits: Option<GasLimits>,
    #[serde(default)]
    pub gas_price: Option<u128>,
    #[serde(default)]
    pub min_execution_fee: Option<u128>,
    #[serde(default)]
    pub execution_fee_multipliers: ExecutionFeeMultipliers,
    #[serde(default)]
    pub referral: Option<ReferralInfo>,
    #[serde(default)]
    pub ui_fee_factor: Decimal,
    #[serde(default)]
    pub min_collateral_usd: Decimal,
    #[serde(default)]
    pub min_position_size_usd: Decimal,
    /// Submit even when validation reports an error.
    #[serde(default)]
    pub skip_validation: bool,
}

impl SellerContext {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            account: None,
            subaccount: None,
            markets: Vec::new(),
            tokens: Vec::new(),
            native_token: None,
            swap_markets: Vec::new(),
            gas_limits: None,
            gas_price: None,
            min_execution_fee: None,
            execution_fee_multipliers: ExecutionFeeMultipliers::default(),
            referral: None,
            ui_fee_factor: Decimal::ZERO,
            min_collateral_usd: Decimal::ZERO,
            min_position_size_usd: Decimal::ZERO,
            skip_validation: false,
        }
    }

    pub fn market(&self, address: &str) -> Option<&MarketInfo> {
        self.markets.iter().find(|m| m.market_address.eq_ignore_ascii_case(address))
    }

    pub fn token(&self, address: &str) -> Option<&TokenInfo> {
        self.tokens
            .iter()
            .chain(self.native_token.iter())
            .find(|t| t.address.eq_ignore_ascii_case(address))
    }
}
