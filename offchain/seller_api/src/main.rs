use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use decrease_engine::{ChainId, Position};
use seller_api::chain::ChainSubmitter;
use seller_api::config::Settings;
use seller_api::session::{RequestPatch, SellerContext};
use seller_api::ui_version::UiVersionPoller;
use seller_api::{PositionSeller, SubmitOutcome};

#[derive(Clone)]
struct AppState {
    seller: Arc<PositionSeller<ChainSubmitter>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let settings = Settings::parse();

    let chain = ChainSubmitter::new(&settings.chain, settings.chain_id);
    info!(target = "seller", active = chain.is_active(), router = ?chain.router_address, "order router");
    let seller = Arc::new(PositionSeller::new(
        chain,
        settings.seller,
        SellerContext::new(ChainId(settings.chain_id)),
    ));

    if let Some(url) = settings.ui_version_url.clone() {
        let poller = UiVersionPoller::new(url, settings.ui_version.clone());
        let every = Duration::from_secs(settings.ui_version_poll_secs.max(1));
        tokio::spawn(poller.run(Arc::clone(&seller), every));
    }

    let app = Router::new()
        .route("/seller", get(get_view))
        .route("/seller/position", post(select_position))
        .route("/seller/request", post(update_request))
        .route("/seller/context", post(set_context))
        .route("/seller/submit", post(submit))
        .route("/seller/close", post(close))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { seller });

    let listener = TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("binding {}", settings.bind))?;
    info!(target = "seller", "Listening on {}", settings.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_view(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.seller.view())
}

async fn select_position(State(state): State<AppState>, Json(position): Json<Option<Position>>) -> impl IntoResponse {
    state.seller.select_position(position);
    Json(state.seller.view())
}

async fn update_request(State(state): State<AppState>, Json(patch): Json<RequestPatch>) -> impl IntoResponse {
    state.seller.update_request(patch);
    Json(state.seller.view())
}

async fn set_context(State(state): State<AppState>, Json(context): Json<SellerContext>) -> impl IntoResponse {
    state.seller.set_context(context);
    Json(state.seller.view())
}

async fn close(State(state): State<AppState>) -> impl IntoResponse {
    state.seller.close();
    StatusCode::NO_CONTENT
}

async fn submit(State(state): State<AppState>) -> impl IntoResponse {
    let (code, body) = match state.seller.submit().await {
        SubmitOutcome::Submitted(tx) => (StatusCode::OK, json!({ "status": "submitted", "tx": tx })),
        SubmitOutcome::ConnectWallet => (StatusCode::UNAUTHORIZED, json!({ "status": "connect_wallet" })),
        SubmitOutcome::NotReady => (StatusCode::CONFLICT, json!({ "status": "not_ready" })),
        SubmitOutcome::InFlight => (StatusCode::CONFLICT, json!({ "status": "in_flight" })),
        SubmitOutcome::Blocked(e) => (StatusCode::UNPROCESSABLE_ENTITY, json!({ "status": "blocked", "error": e.to_string() })),
        SubmitOutcome::Failed(reason) => (StatusCode::BAD_GATEWAY, json!({ "status": "failed", "error": reason })),
    };
    (code, Json(body))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "submitting": state.seller.is_submitting(),
        "onchain": state.seller.submitter().is_active(),
    }))
}
