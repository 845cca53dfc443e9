//! 交易记录 API
//! 账目记录的创建、查询与状态更新

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::response::{created_response, success_response, ApiResponse},
    app_state::AppState,
    error::{field_error, AppError},
    repository::{NewTransaction, Transaction, TxnStatus, TxnType},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    pub wallet_id: Uuid,
    pub txn_amount: Decimal,
    /// 省略时默认 BTC
    pub currency: Option<String>,
    pub txn_type: TxnType,
    /// 服务商侧交易 ID，全局唯一
    pub reference: String,
    pub to_address: Option<String>,
    pub from_address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTransactionStatusRequest {
    pub txn_status: TxnStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub txn_id: Uuid,
    pub wallet_id: Uuid,
    pub txn_amount: Decimal,
    pub currency: String,
    pub txn_status: TxnStatus,
    pub txn_type: TxnType,
    pub reference: String,
    pub to_address: Option<String>,
    pub from_address: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(txn: Transaction) -> Self {
        Self {
            txn_id: txn.txn_id,
            wallet_id: txn.wallet_id,
            txn_amount: txn.txn_amount,
            currency: txn.currency,
            txn_status: txn.txn_status,
            txn_type: txn.txn_type,
            reference: txn.reference,
            to_address: txn.to_address,
            from_address: txn.from_address,
            confirmed_at: txn.confirmed_at,
            created_at: txn.created_at,
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_transaction).get(list_transactions))
        .route("/:id", get(get_transaction))
        .route("/:id/status", patch(update_transaction_status))
}

/// POST /api/v1/transactions
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Validation failure or duplicate reference", body = crate::error::ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), AppError> {
    let mut details = Vec::new();
    if req.reference.is_empty() || req.reference.len() > 100 {
        details.push(field_error(
            "reference",
            "Reference must be between 1 and 100 characters",
            "invalid_length",
        ));
    }
    if req.txn_amount <= Decimal::ZERO {
        details.push(field_error(
            "txn_amount",
            "Amount must be positive",
            "out_of_range",
        ));
    }
    if !details.is_empty() {
        return Err(AppError::validation_failed(details));
    }

    let txn = state
        .transaction_service
        .create(NewTransaction {
            wallet_id: req.wallet_id,
            txn_amount: req.txn_amount,
            currency: req.currency.unwrap_or_else(|| "BTC".to_string()),
            txn_type: req.txn_type,
            reference: req.reference,
            to_address: req.to_address,
            from_address: req.from_address,
        })
        .await?;

    created_response(
        TransactionResponse::from(txn),
        "Transaction recorded successfully",
    )
}

/// GET /api/v1/transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Transaction list", body = ApiResponse<Vec<TransactionResponse>>)
    ),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, AppError> {
    let txns = state.transaction_service.list().await?;
    success_response(txns.into_iter().map(TransactionResponse::from).collect())
}

/// GET /api/v1/transactions/{id}
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransactionResponse>>, AppError> {
    let txn = state.transaction_service.get(id).await?;
    success_response(TransactionResponse::from(txn))
}

/// PATCH /api/v1/transactions/{id}/status
#[utoipa::path(
    patch,
    path = "/api/v1/transactions/{id}/status",
    params(("id" = Uuid, Path, description = "Transaction id")),
    request_body = UpdateTransactionStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn update_transaction_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTransactionStatusRequest>,
) -> Result<Json<ApiResponse<TransactionResponse>>, AppError> {
    let txn = state
        .transaction_service
        .update_status(id, req.txn_status, req.confirmed_at)
        .await?;
    success_response(TransactionResponse::from(txn))
}
