//! Close dialog controller: derives the view model from the session and context, and turns an
//! explicit submit into exactly one order submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use decrease_engine::fees::{get_trade_fees, TradeFees, TradeFeesParams};
use decrease_engine::gas::{
    estimate_execute_decrease_order_gas_limit, execution_fee_from_amount, get_execution_fee, ExecutionFee,
};
use decrease_engine::position::current_liquidation_price;
use decrease_engine::swap::{get_swap_amounts_by_from_value, is_equivalent_tokens, DirectSwapRouter, SwapAmounts, SwapPathStats, SwapRouter};
use decrease_engine::validation::{
    first_error, get_common_error, get_decrease_error, CommonErrorParams, DecreaseErrorParams, PriceImpactWarning,
    TradeError,
};
use decrease_engine::{
    plan_decrease, DecreaseAmounts, DecreaseParams, DecreasePlan, DecreasePositionSwapType, NextPositionValues,
    OrderMode, Position, TokenInfo,
};

use crate::config::SellerSettings;
use crate::session::{DecreaseRequest, RequestPatch, SellerContext, SellerSession};
use crate::submitter::{DecreaseOrder, OrderSubmitter, PendingTx};

pub const CREATING_ORDER: &str = "Creating order...";

fn lock<'a, T>(m: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match m.lock() {
        Ok(g) => g,
        Err(e) => {
            warn!(target = "seller", "Recovered from poisoned mutex: {}", name);
            e.into_inner()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerView {
    pub position: Option<Position>,
    pub request: DecreaseRequest,
    pub keep_leverage: bool,
    pub allowed_slippage_bps: u32,
    pub decrease_amounts: Option<DecreaseAmounts>,
    pub next_position_values: Option<NextPositionValues>,
    pub next_position_values_without_keep_leverage: Option<NextPositionValues>,
    pub leverage_checkbox_disabled: bool,
    pub default_trigger_acceptable_price_impact_bps: Option<u32>,
    pub liquidation_price: Option<Decimal>,
    pub receive_token: Option<TokenInfo>,
    pub receive_usd: Option<Decimal>,
    pub receive_token_amount: Option<Decimal>,
    pub swap_amounts: Option<SwapAmounts>,
    pub fees: Option<TradeFees>,
    pub execution_fee: Option<ExecutionFee>,
    pub price_impact_warning: PriceImpactWarning,
    pub error: Option<String>,
    pub is_submitting: bool,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// No account: the caller should open its connect flow.
    ConnectWallet,
    /// Some derived value is still missing.
    NotReady,
    Blocked(TradeError),
    InFlight,
    Submitted(PendingTx),
    Failed(String),
}

struct Derived {
    view: SellerView,
    error: Option<TradeError>,
    order: Option<DecreaseOrder>,
}

/// Clears the submitting flag on every exit path.
struct SubmittingGuard<'a>(&'a AtomicBool);

impl<'a> SubmittingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PositionSeller<S> {
    submitter: S,
    settings: SellerSettings,
    session: Mutex<SellerSession>,
    context: Mutex<SellerContext>,
    is_submitting: AtomicBool,
    has_outdated_ui: AtomicBool,
}

impl<S: OrderSubmitter> PositionSeller<S> {
    pub fn new(submitter: S, settings: SellerSettings, context: SellerContext) -> Self {
        Self {
            submitter,
            session: Mutex::new(SellerSession::new(settings.default_allowed_slippage_bps)),
            settings,
            context: Mutex::new(context),
            is_submitting: AtomicBool::new(false),
            has_outdated_ui: AtomicBool::new(false),
        }
    }

    pub fn submitter(&self) -> &S { &self.submitter }
    pub fn settings(&self) -> &SellerSettings { &self.settings }
    pub fn is_submitting(&self) -> bool { self.is_submitting.load(Ordering::Acquire) }

    pub fn is_connected(&self) -> bool {
        lock(&self.context, "context").account.is_some()
    }

    pub fn set_outdated_ui(&self, outdated: bool) {
        if self.has_outdated_ui.swap(outdated, Ordering::AcqRel) != outdated {
            info!(target = "seller", outdated, "client version status changed");
        }
    }

    pub fn set_context(&self, context: SellerContext) {
        *lock(&self.context, "context") = context;
    }

    /// Opens the dialog for `position`, or closes it with `None`.
    pub fn select_position(&self, position: Option<Position>) {
        let mut session = lock(&self.session, "session");
        debug!(target = "seller", key = ?position.as_ref().map(|p| p.key.as_str()), "select position");
        session.select_position(position);
    }

    pub fn update_request(&self, patch: RequestPatch) {
        lock(&self.session, "session").apply(patch);
    }

    pub fn close(&self) {
        lock(&self.session, "session").close();
    }

    pub fn view(&self) -> SellerView {
        self.derive().view
    }

    fn derive(&self) -> Derived {
        let session = lock(&self.session, "session");
        let context = lock(&self.context, "context");
        derive(
            &session,
            &context,
            &self.settings,
            self.is_submitting(),
            self.has_outdated_ui.load(Ordering::Acquire),
        )
    }

    pub async fn submit(&self) -> SubmitOutcome {
        if self.is_submitting() {
            return SubmitOutcome::InFlight;
        }
        let (derived, skip_validation, subaccount, connected) = {
            let session = lock(&self.session, "session");
            let context = lock(&self.context, "context");
            let derived = derive(
                &session,
                &context,
                &self.settings,
                false,
                self.has_outdated_ui.load(Ordering::Acquire),
            );
            (derived, context.skip_validation, context.subaccount.clone(), context.account.is_some())
        };

        if !connected {
            return SubmitOutcome::ConnectWallet;
        }
        if let Some(error) = derived.error {
            if !skip_validation {
                debug!(target = "seller", %error, "submit blocked");
                return SubmitOutcome::Blocked(error);
            }
        }
        let Some(order) = derived.order else {
            return SubmitOutcome::NotReady;
        };
        let Some(_guard) = SubmittingGuard::acquire(&self.is_submitting) else {
            return SubmitOutcome::InFlight;
        };

        info!(
            target = "seller",
            market = %order.market_address,
            order_type = ?order.order_type,
            size_delta_usd = %order.size_delta_usd,
            acceptable_price = %order.acceptable_price,
            "submitting decrease order"
        );
        match self.submitter.submit_decrease(order, subaccount).await {
            Ok(tx) => {
                info!(target = "seller", hash = ?tx.hash, "decrease order sent");
                self.close();
                SubmitOutcome::Submitted(tx)
            }
            Err(e) => {
                warn!(target = "seller", error = %e, "decrease order failed");
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Receive token: the collateral token for trigger orders; otherwise the override, falling
/// back to the collateral token in its native form.
fn resolve_receive_token(position: &Position, request: &DecreaseRequest, ctx: &SellerContext) -> Option<TokenInfo> {
    let collateral = &position.collateral_token;
    if request.order_mode == OrderMode::Trigger {
        return Some(collateral.clone());
    }
    if let Some(address) = request.receive_token_address.as_deref() {
        return ctx.token(address).cloned();
    }
    match &ctx.native_token {
        Some(native) if is_equivalent_tokens(native, collateral) => Some(native.clone()),
        _ => Some(collateral.clone()),
    }
}

/// Keeps the estimate above the router's minimum fee floored by the per-chain multiplier table.
fn with_min_execution_fee(ctx: &SellerContext, native: &TokenInfo, fee: ExecutionFee, gas_price: u128) -> ExecutionFee {
    let Some(min_fee) = ctx.min_execution_fee else {
        return fee;
    };
    let floor = ctx.execution_fee_multipliers.final_execution_fee(ctx.chain_id, min_fee, Some(gas_price));
    if floor > fee.fee_token_amount {
        execution_fee_from_amount(ctx.chain_id, native, floor)
    } else {
        fee
    }
}

fn fees_and_execution_fee(
    ctx: &SellerContext,
    position: &Position,
    amounts: &DecreaseAmounts,
    swap_stats: Option<&SwapPathStats>,
) -> Option<(TradeFees, Option<ExecutionFee>)> {
    let gas_limits = ctx.gas_limits.as_ref()?;
    let gas_price = ctx.gas_price?;
    let native = ctx.native_token.as_ref()?;

    let swaps_count = u64::from(amounts.decrease_swap_type != DecreasePositionSwapType::NoSwap)
        + swap_stats.map_or(0, |s| s.swap_path.len() as u64);
    let estimated_gas = estimate_execute_decrease_order_gas_limit(gas_limits, swaps_count);

    let fees = get_trade_fees(&TradeFeesParams {
        initial_collateral_usd: position.collateral_usd(),
        size_delta_usd: amounts.size_delta_usd,
        swap_steps: swap_stats.map(|s| s.swap_steps.as_slice()).unwrap_or_default(),
        position_fee_usd: amounts.position_fee_usd,
        swap_price_impact_delta_usd: swap_stats.map_or(Decimal::ZERO, |s| s.total_swap_price_impact_delta_usd),
        position_price_impact_delta_usd: amounts.position_price_impact_delta_usd,
        price_impact_diff_usd: amounts.price_impact_diff_usd,
        borrowing_fee_usd: amounts.borrowing_fee_usd,
        funding_fee_usd: amounts.funding_fee_usd,
        fee_discount_usd: amounts.fee_discount_usd,
        swap_profit_fee_usd: amounts.swap_profit_fee_usd,
        ui_fee_factor: ctx.ui_fee_factor,
    });
    let execution_fee = get_execution_fee(ctx.chain_id, gas_limits, native, estimated_gas, gas_price)
        .map(|fee| with_min_execution_fee(ctx, native, fee, gas_price));
    Some((fees, execution_fee))
}

fn build_order(
    ctx: &SellerContext,
    session: &SellerSession,
    position: &Position,
    plan: Option<&DecreasePlan>,
    receive_token: Option<&TokenInfo>,
    swap_stats: Option<&SwapPathStats>,
    execution_fee: Option<&ExecutionFee>,
) -> Option<DecreaseOrder> {
    let account = ctx.account.clone()?;
    let amounts = &plan?.amounts;
    let request = session.request();
    let order_type = amounts.order_type(request.order_mode)?;
    let acceptable_price = amounts.acceptable_price?;
    let receive_token = receive_token?;
    let execution_fee = execution_fee.filter(|f| f.fee_token_amount > 0)?;

    Some(DecreaseOrder {
        account,
        market_address: position.market_address.clone(),
        initial_collateral_address: position.collateral_token.address.clone(),
        initial_collateral_delta_amount: amounts.collateral_delta_amount,
        collateral_token_decimals: position.collateral_token.decimals,
        receive_token_address: receive_token.address.clone(),
        should_unwrap_native_token: receive_token.is_native,
        swap_path: swap_stats.map(|s| s.swap_path.clone()).unwrap_or_default(),
        size_delta_usd: amounts.size_delta_usd,
        size_delta_in_tokens: amounts.size_delta_in_tokens,
        index_token_decimals: position.index_token.decimals,
        is_long: position.is_long(),
        acceptable_price,
        trigger_price: match request.order_mode {
            OrderMode::Trigger => amounts.trigger_price,
            OrderMode::Market => None,
        },
        min_output_usd: Decimal::ZERO,
        decrease_position_swap_type: amounts.decrease_swap_type,
        order_type,
        referral_code: ctx.referral.as_ref().and_then(|r| r.referral_code.clone()),
        execution_fee: execution_fee.fee_token_amount,
        allowed_slippage_bps: session.allowed_slippage_bps(),
        skip_simulation: ctx.skip_validation,
    })
}

fn derive(
    session: &SellerSession,
    ctx: &SellerContext,
    settings: &SellerSettings,
    is_submitting: bool,
    has_outdated_ui: bool,
) -> Derived {
    let mut view = SellerView {
        position: session.position().cloned(),
        request: session.request().clone(),
        keep_leverage: session.keep_leverage(),
        allowed_slippage_bps: session.allowed_slippage_bps(),
        decrease_amounts: None,
        next_position_values: None,
        next_position_values_without_keep_leverage: None,
        leverage_checkbox_disabled: false,
        default_trigger_acceptable_price_impact_bps: None,
        liquidation_price: None,
        receive_token: None,
        receive_usd: None,
        receive_token_amount: None,
        swap_amounts: None,
        fees: None,
        execution_fee: None,
        price_impact_warning: PriceImpactWarning::default(),
        error: None,
        is_submitting,
    };
    let (Some(position), Some(market)) = (
        session.position(),
        session.position().and_then(|p| ctx.market(&p.market_address)),
    ) else {
        return Derived { view, error: None, order: None };
    };

    let request = session.request();
    let is_trigger = request.order_mode == OrderMode::Trigger;
    let params = DecreaseParams {
        position,
        market,
        close_size_usd: request.close_usd.unwrap_or(Decimal::ZERO),
        order_mode: request.order_mode,
        trigger_price: request.trigger_price,
        keep_leverage: session.keep_leverage(),
        allowed_slippage_bps: session.allowed_slippage_bps(),
        selected_acceptable_price_impact_bps: request.selected_trigger_acceptable_price_impact_bps,
        acceptable_price_impact_buffer_bps: settings.acceptable_price_impact_buffer_bps,
        referral: ctx.referral.as_ref(),
        ui_fee_factor: ctx.ui_fee_factor,
    };
    let plan = plan_decrease(&params, ctx.min_collateral_usd);
    let amounts = plan.as_ref().map(|p| &p.amounts);

    let receive_token = resolve_receive_token(position, request, ctx);
    let router = DirectSwapRouter::new(ctx.swap_markets.clone());
    let should_swap = receive_token
        .as_ref()
        .is_some_and(|t| !is_equivalent_tokens(&position.collateral_token, t));
    let swap_amounts = match (amounts, receive_token.as_ref()) {
        (Some(a), Some(token)) if should_swap && a.receive_token_amount > Decimal::ZERO => Some(
            get_swap_amounts_by_from_value(&position.collateral_token, token, a.receive_token_amount, &router, ctx.ui_fee_factor),
        ),
        _ => None,
    };
    let routed = swap_amounts.as_ref().filter(|s| s.swap_path_stats.is_some());
    let swap_stats = routed.and_then(|s| s.swap_path_stats.as_ref());
    let receive_usd = routed.map(|s| s.usd_out).or(amounts.map(|a| a.receive_usd));
    let receive_token_amount = routed.map(|s| s.amount_out).or(amounts.map(|a| a.receive_token_amount));

    let (fees, execution_fee) = match amounts.and_then(|a| fees_and_execution_fee(ctx, position, a, swap_stats)) {
        Some((fees, execution_fee)) => (Some(fees), execution_fee),
        None => (None, None),
    };

    let acks = session.acknowledgments();
    let price_impact_warning = PriceImpactWarning::from_fees(
        fees.as_ref(),
        settings.high_price_impact_bps,
        acks.high_position_impact,
        acks.high_swap_impact,
    );
    let is_not_enough_receive_token_liquidity = match (should_swap, receive_token.as_ref(), receive_usd) {
        (true, Some(token), Some(usd)) => router.max_swap_liquidity_usd(&position.collateral_token, token) < usd,
        _ => false,
    };
    let liquidation_price = current_liquidation_price(position, market, ctx.min_collateral_usd);

    let common_error = get_common_error(&CommonErrorParams {
        is_connected: ctx.account.is_some(),
        has_outdated_ui,
        allowed_slippage_bps: session.allowed_slippage_bps(),
        excessive_slippage_bps: settings.excessive_slippage_bps,
    });
    let decrease_error = get_decrease_error(&DecreaseErrorParams {
        market,
        position,
        input_size_usd: request.close_usd.unwrap_or(Decimal::ZERO),
        size_delta_usd: amounts.map(|a| a.size_delta_usd),
        is_trigger,
        trigger_price: request.trigger_price,
        mark_price: amounts.map(|a| a.mark_price),
        liquidation_price,
        next_position_values: plan.as_ref().map(|p| &p.next_position_values),
        is_full_close: amounts.is_some_and(|a| a.is_full_close),
        min_collateral_usd: ctx.min_collateral_usd,
        min_position_size_usd: ctx.min_position_size_usd,
        price_impact_warning,
        is_not_enough_receive_token_liquidity,
    });
    let error = first_error(common_error, decrease_error);

    let order = build_order(
        ctx,
        session,
        position,
        plan.as_ref(),
        receive_token.as_ref(),
        swap_stats,
        execution_fee.as_ref(),
    );

    view.error = match &error {
        Some(e) => Some(e.to_string()),
        None if is_submitting => Some(CREATING_ORDER.to_string()),
        None => None,
    };
    view.default_trigger_acceptable_price_impact_bps = amounts
        .filter(|_| is_trigger)
        .map(|a| a.recommended_acceptable_price_delta_bps);
    view.liquidation_price = liquidation_price;
    view.receive_token = receive_token;
    view.receive_usd = receive_usd;
    view.receive_token_amount = receive_token_amount;
    view.swap_amounts = swap_amounts;
    view.fees = fees;
    view.execution_fee = execution_fee;
    view.price_impact_warning = price_impact_warning;
    if let Some(plan) = plan {
        view.leverage_checkbox_disabled = plan.leverage_checkbox_disabled;
        view.next_position_values = Some(plan.next_position_values);
        view.next_position_values_without_keep_leverage = Some(plan.next_position_values_without_keep_leverage);
        view.decrease_amounts = Some(plan.amounts);
    }

    Derived { view, error, order }
}
