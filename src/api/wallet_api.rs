//! 服务商托管钱包 API
//! 创建/查询 Bitnob 侧加密货币钱包的透传接口

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    api::response::{created_response, success_response, ApiResponse},
    app_state::AppState,
    error::AppError,
};

const SUPPORTED_COINS: &[&str] = &["trx", "bnb"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    pub coin: String,
}

fn check_coin(coin: &str) -> Result<(), AppError> {
    if !SUPPORTED_COINS.contains(&coin) {
        return Err(AppError::bad_request(
            "Invalid coin type. Must be either \"trx\" or \"bnb\"",
        ));
    }
    Ok(())
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_wallet).get(list_wallets))
        .route("/:coin", get(get_wallet_by_coin))
}

/// POST /api/v1/wallets
///
/// 在服务商侧创建加密货币钱包
#[utoipa::path(
    post,
    path = "/api/v1/wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid coin or provider failure", body = crate::error::ErrorResponse)
    ),
    tag = "Wallets"
)]
pub async fn create_wallet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    check_coin(&req.coin)?;

    let wallet = state.bitnob.create_crypto_wallet(&req.coin).await?;
    created_response(wallet, "Wallet created successfully")
}

/// GET /api/v1/wallets
///
/// 列出服务商侧钱包
#[utoipa::path(
    get,
    path = "/api/v1/wallets",
    responses(
        (status = 200, description = "Wallet list", body = ApiResponse<serde_json::Value>),
        (status = 502, description = "Provider unavailable", body = crate::error::ErrorResponse)
    ),
    tag = "Wallets"
)]
pub async fn list_wallets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let wallets = state.bitnob.list_wallets().await?;
    success_response(wallets)
}

/// GET /api/v1/wallets/{coin}
///
/// 按币种查询服务商侧钱包
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{coin}",
    params(("coin" = String, Path, description = "Coin type (trx or bnb)")),
    responses(
        (status = 200, description = "Wallet", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid coin", body = crate::error::ErrorResponse)
    ),
    tag = "Wallets"
)]
pub async fn get_wallet_by_coin(
    State(state): State<Arc<AppState>>,
    Path(coin): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    check_coin(&coin)?;

    let wallet = state.bitnob.wallet_by_coin(&coin).await?;
    success_response(wallet)
}
