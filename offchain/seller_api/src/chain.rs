//! Order router backend (optional, behind `onchain` feature).
//! Without the feature, or without RPC/key/router configured, orders are only logged.

#[cfg(feature = "onchain")]
use ethers::{prelude::*, types::{Address, U256}};
use tracing::info;

use decrease_engine::units::{
    to_contract_acceptable_price, to_contract_price, to_contract_usd, to_token_units, ContractUint, UnitsError,
};
use decrease_engine::{DecreaseOrderType, DecreasePositionSwapType};

use crate::config::ChainSettings;
use crate::submitter::{DecreaseOrder, OrderSubmitter, PendingTx, Subaccount, SubmitError};

#[cfg(feature = "onchain")]
abigen!(
    OrderRouter,
    r#"[
        function createDecreaseOrder(address receiver, address market, address initialCollateralToken, address[] swapPath, uint256 sizeDeltaUsd, uint256 initialCollateralDeltaAmount, uint256 triggerPrice, uint256 acceptablePrice, uint256 executionFee, uint256 minOutputUsd, uint8 orderType, uint8 decreasePositionSwapType, bool isLong, bool shouldUnwrapNativeToken, bytes32 referralCode) external payable returns (bytes32)
    ]"#
);

#[cfg(feature = "onchain")]
type WalletSigner = LocalWallet;

pub fn order_type_code(order_type: DecreaseOrderType) -> u8 {
    match order_type {
        DecreaseOrderType::MarketDecrease => 4,
        DecreaseOrderType::LimitDecrease => 5,
        DecreaseOrderType::StopLossDecrease => 6,
    }
}

pub fn swap_type_code(swap_type: DecreasePositionSwapType) -> u8 {
    match swap_type {
        DecreasePositionSwapType::NoSwap => 0,
        DecreasePositionSwapType::SwapPnlTokenToCollateralToken => 1,
        DecreasePositionSwapType::SwapCollateralTokenToPnlToken => 2,
    }
}

/// Referral codes travel as a right-padded `bytes32` string; longer codes are cut.
pub fn referral_code_bytes(code: Option<&str>) -> [u8; 32] {
    let mut out = [0u8; 32];
    if let Some(code) = code {
        let bytes = code.as_bytes();
        let n = bytes.len().min(32);
        out[..n].copy_from_slice(&bytes[..n]);
    }
    out
}

/// Order fields in contract units.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractOrder {
    pub size_delta_usd: u128,
    pub initial_collateral_delta_amount: u128,
    pub trigger_price: u128,
    pub acceptable_price: ContractUint,
    pub execution_fee: u128,
    pub min_output_usd: u128,
    pub order_type: u8,
    pub decrease_position_swap_type: u8,
    pub referral_code: [u8; 32],
}

pub fn encode_order(order: &DecreaseOrder) -> Result<ContractOrder, SubmitError> {
    let units = |field: &'static str| move |source: UnitsError| SubmitError::Units { field, source };
    Ok(ContractOrder {
        size_delta_usd: to_contract_usd(order.size_delta_usd).map_err(units("size_delta_usd"))?,
        initial_collateral_delta_amount: to_token_units(order.initial_collateral_delta_amount, order.collateral_token_decimals)
            .map_err(units("initial_collateral_delta_amount"))?,
        trigger_price: match order.trigger_price {
            Some(p) => to_contract_price(p, order.index_token_decimals).map_err(units("trigger_price"))?,
            None => 0,
        },
        acceptable_price: to_contract_acceptable_price(order.acceptable_price, order.index_token_decimals)
            .map_err(units("acceptable_price"))?,
        execution_fee: order.execution_fee,
        min_output_usd: to_contract_usd(order.min_output_usd).map_err(units("min_output_usd"))?,
        order_type: order_type_code(order.order_type),
        decrease_position_swap_type: swap_type_code(order.decrease_position_swap_type),
        referral_code: referral_code_bytes(order.referral_code.as_deref()),
    })
}

#[derive(Clone)]
pub struct ChainSubmitter {
    #[cfg(feature = "onchain")]
    router: Option<OrderRouter<SignerMiddleware<Provider<Http>, WalletSigner>>>,
    // kept for logs
    pub router_address: Option<String>,
}

impl ChainSubmitter {
    pub fn new(settings: &ChainSettings, chain_id: u64) -> Self {
        let router_address = settings.order_router_address.clone();
        #[cfg(feature = "onchain")]
        {
            if let (Some(rpc), Some(pk), Some(ra)) = (&settings.rpc_url, &settings.private_key, &router_address) {
                if let Ok(provider) = Provider::<Http>::try_from(rpc.as_str()) {
                    if let Ok(wallet) = pk.parse::<LocalWallet>() {
                        let signer = SignerMiddleware::new(provider, wallet.with_chain_id(chain_id));
                        if let Ok(address) = ra.parse::<Address>() {
                            let router = OrderRouter::new(address, std::sync::Arc::new(signer));
                            return Self { router: Some(router), router_address };
                        }
                    }
                }
            }
            tracing::warn!(target = "seller", "order router not configured, submissions are dry runs");
            Self { router: None, router_address }
        }
        #[cfg(not(feature = "onchain"))]
        {
            let _ = chain_id;
            Self { router_address }
        }
    }

    pub fn is_active(&self) -> bool {
        #[cfg(feature = "onchain")]
        { self.router.is_some() }
        #[cfg(not(feature = "onchain"))]
        { false }
    }

    #[cfg(feature = "onchain")]
    async fn send(
        &self,
        router: &OrderRouter<SignerMiddleware<Provider<Http>, WalletSigner>>,
        order: &DecreaseOrder,
        encoded: ContractOrder,
    ) -> Result<String, SubmitError> {
        let address = |s: &str| s.parse::<Address>().map_err(|_| SubmitError::Address(s.to_string()));
        let swap_path = order.swap_path.iter().map(|s| address(s)).collect::<Result<Vec<_>, _>>()?;
        let acceptable_price = match encoded.acceptable_price {
            ContractUint::Value(v) => U256::from(v),
            ContractUint::Max => U256::MAX,
        };
        let call = router
            .create_decrease_order(
                address(&order.account)?,
                address(&order.market_address)?,
                address(&order.initial_collateral_address)?,
                swap_path,
                U256::from(encoded.size_delta_usd),
                U256::from(encoded.initial_collateral_delta_amount),
                U256::from(encoded.trigger_price),
                acceptable_price,
                U256::from(encoded.execution_fee),
                U256::from(encoded.min_output_usd),
                encoded.order_type,
                encoded.decrease_position_swap_type,
                order.is_long,
                order.should_unwrap_native_token,
                encoded.referral_code,
            )
            .value(U256::from(encoded.execution_fee));
        if !order.skip_simulation {
            call.call().await.map_err(|e| SubmitError::Chain(e.to_string()))?;
        }
        let tx = call.send().await.map_err(|e| SubmitError::Chain(e.to_string()))?;
        let txh = tx.tx_hash();
        Ok(format!("0x{}", hex::encode(txh.as_bytes())))
    }
}

impl OrderSubmitter for ChainSubmitter {
    async fn submit_decrease(&self, order: DecreaseOrder, subaccount: Option<Subaccount>) -> Result<PendingTx, SubmitError> {
        let encoded = encode_order(&order)?;
        if let Some(sub) = &subaccount {
            info!(target = "seller", subaccount = %sub.address, "signing with session key");
        }
        #[cfg(feature = "onchain")]
        {
            if let Some(router) = &self.router {
                let hash = self.send(router, &order, encoded).await?;
                return Ok(PendingTx { hash: Some(hash), order_type: order.order_type });
            }
        }
        info!(
            target = "seller",
            router = ?self.router_address,
            order = ?encoded,
            "dry run: decrease order not sent"
        );
        Ok(PendingTx { hash: None, order_type: order.order_type })
    }
}
