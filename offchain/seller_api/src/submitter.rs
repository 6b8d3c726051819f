use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use decrease_engine::{DecreaseOrderType, DecreasePositionSwapType, UnitsError};

/// Fully formed decrease order, in human units. Conversion to contract units happens in the
/// submitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecreaseOrder {
    pub account: String,
    pub market_address: String,
    pub initial_collateral_address: String,
    pub initial_collateral_delta_amount: Decimal,
    pub collateral_token_decimals: u32,
    pub receive_token_address: String,
    /// Pay out the native token instead of its wrapped form.
    pub should_unwrap_native_token: bool,
    pub swap_path: Vec<String>,
    pub size_delta_usd: Decimal,
    pub size_delta_in_tokens: Decimal,
    pub index_token_decimals: u32,
    pub is_long: bool,
    pub acceptable_price: Decimal,
    pub trigger_price: Option<Decimal>,
    pub min_output_usd: Decimal,
    pub decrease_position_swap_type: DecreasePositionSwapType,
    pub order_type: DecreaseOrderType,
    pub referral_code: Option<String>,
    /// Native token wei.
    pub execution_fee: u128,
    pub allowed_slippage_bps: u32,
    pub skip_simulation: bool,
}

/// Session key allowed to sign on behalf of the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subaccount {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingTx {
    /// Absent for dry runs.
    pub hash: Option<String>,
    pub order_type: DecreaseOrderType,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("rejected by wallet: {0}")]
    Rejected(String),
    #[error("chain error: {0}")]
    Chain(String),
    #[error("invalid order field {field}: {source}")]
    Units {
        field: &'static str,
        #[source]
        source: UnitsError,
    },
    #[error("invalid address {0}")]
    Address(String),
}

/// Sends one decrease order. Exactly one call per accepted submit.
pub trait OrderSubmitter: Send + Sync {
    fn submit_decrease(
        &self,
        order: DecreaseOrder,
        subaccount: Option<Subaccount>,
    ) -> impl Future<Output = Result<PendingTx, SubmitError>> + Send;
}
