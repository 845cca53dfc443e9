//! 汇率 API
//! 单币种汇率、完整汇率表与跨币种换算

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    api::response::{success_response, ApiResponse},
    app_state::AppState,
    error::{field_error, AppError},
    service::currency_service::ConversionResult,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertRequest {
    pub amount: Decimal,
    pub from: String,
    pub to: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rate/:currency", get(get_currency_rate))
        .route("/rates", get(get_exchange_rates))
        .route("/convert", post(convert_currency))
}

/// GET /api/v1/currency/rate/{currency}
#[utoipa::path(
    get,
    path = "/api/v1/currency/rate/{currency}",
    params(("currency" = String, Path, description = "Currency code, e.g. USD")),
    responses(
        (status = 200, description = "Payout rate", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Provider failure", body = crate::error::ErrorResponse)
    ),
    tag = "Currency"
)]
pub async fn get_currency_rate(
    State(state): State<Arc<AppState>>,
    Path(currency): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    if currency.is_empty() || currency.len() > 5 || !currency.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(AppError::bad_request("Invalid currency code"));
    }

    let rate = state.currency_service.payout_rate(&currency).await?;
    success_response(rate)
}

/// GET /api/v1/currency/rates
#[utoipa::path(
    get,
    path = "/api/v1/currency/rates",
    responses(
        (status = 200, description = "Exchange rates table", body = ApiResponse<serde_json::Value>),
        (status = 502, description = "Provider unavailable", body = crate::error::ErrorResponse)
    ),
    tag = "Currency"
)]
pub async fn get_exchange_rates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let rates = state.currency_service.exchange_rates().await?;
    success_response(rates)
}

/// POST /api/v1/currency/convert
///
/// 跨币种换算（经由 USD）
#[utoipa::path(
    post,
    path = "/api/v1/currency/convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Conversion result", body = ApiResponse<ConversionResult>),
        (status = 400, description = "Validation or unsupported currency", body = crate::error::ErrorResponse)
    ),
    tag = "Currency"
)]
pub async fn convert_currency(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<ApiResponse<ConversionResult>>, AppError> {
    let mut details = Vec::new();
    if req.amount <= Decimal::ZERO {
        details.push(field_error("amount", "Amount must be positive", "out_of_range"));
    }
    for (field, value) in [("from", &req.from), ("to", &req.to)] {
        if value.is_empty() || value.len() > 5 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
            details.push(field_error(field, "Invalid currency code", "invalid_format"));
        }
    }
    if !details.is_empty() {
        return Err(AppError::validation_failed(details));
    }

    let result = state
        .currency_service
        .convert(req.amount, &req.from, &req.to)
        .await?;
    success_response(result)
}
