use std::net::SocketAddr;

use clap::{Args, Parser};
use serde::{Deserialize, Serialize};

use decrease_engine::decrease::DEFAULT_ACCEPTABLE_PRICE_IMPACT_BUFFER_BPS;
use decrease_engine::validation::{DEFAULT_EXCESSIVE_SLIPPAGE_BPS, DEFAULT_HIGH_PRICE_IMPACT_BPS};

pub const DEFAULT_ALLOWED_SLIPPAGE_BPS: u32 = 30;

/// Service settings; every flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "seller_api", about = "Close-position planner and order submission service")]
pub struct Settings {
    #[arg(long, env = "SELLER_BIND", default_value = "127.0.0.1:8788")]
    pub bind: SocketAddr,

    #[arg(long, env = "CHAIN_ID", default_value_t = 42_161)]
    pub chain_id: u64,

    #[command(flatten)]
    pub chain: ChainSettings,

    /// Endpoint returning the minimum supported client version as plain text.
    #[arg(long, env = "UI_VERSION_URL")]
    pub ui_version_url: Option<String>,

    #[arg(long, env = "UI_VERSION", default_value = "1.4")]
    pub ui_version: String,

    #[arg(long, env = "UI_VERSION_POLL_SECS", default_value_t = 60)]
    pub ui_version_poll_secs: u64,

    #[command(flatten)]
    pub seller: SellerSettings,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ChainSettings {
    #[arg(long = "rpc-url", env = "ARBITRUM_RPC")]
    pub rpc_url: Option<String>,

    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    #[arg(long, env = "ORDER_ROUTER_ADDRESS")]
    pub order_router_address: Option<String>,
}

/// Trading defaults shared by every session.
#[derive(Debug, Clone, Copy, Args, Serialize, Deserialize, PartialEq, Eq)]
pub struct SellerSettings {
    #[arg(long, env = "DEFAULT_SLIPPAGE_BPS", default_value_t = DEFAULT_ALLOWED_SLIPPAGE_BPS)]
    pub default_allowed_slippage_bps: u32,

    #[arg(long, env = "EXCESSIVE_SLIPPAGE_BPS", default_value_t = DEFAULT_EXCESSIVE_SLIPPAGE_BPS)]
    pub excessive_slippage_bps: u32,

    #[arg(long, env = "ACCEPTABLE_PRICE_IMPACT_BUFFER_BPS", default_value_t = DEFAULT_ACCEPTABLE_PRICE_IMPACT_BUFFER_BPS)]
    pub acceptable_price_impact_buffer_bps: u32,

    #[arg(long, env = "HIGH_PRICE_IMPACT_BPS", default_value_t = DEFAULT_HIGH_PRICE_IMPACT_BPS)]
    pub high_price_impact_bps: u32,
}

impl Default for SellerSettings {
    fn default() -> Self {
        Self {
            default_allowed_slippage_bps: DEFAULT_ALLOWED_SLIPPAGE_BPS,
            excessive_slippage_bps: DEFAULT_EXCESSIVE_SLIPPAGE_BPS,
            acceptable_price_impact_buffer_bps: DEFAULT_ACCEPTABLE_PRICE_IMPACT_BUFFER_BPS,
            high_price_impact_bps: DEFAULT_HIGH_PRICE_IMPACT_BPS,
        }
    }
}
