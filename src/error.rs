use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::service::bitnob_client::ProviderError;
use crate::service::btc_address_service::AddressServiceError;
use crate::service::currency_service::CurrencyServiceError;
use crate::service::transaction_service::TransactionServiceError;

/// 字段级校验错误
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: String,
}

pub fn field_error(field: &str, message: impl Into<String>, code: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: message.into(),
        code: code.to_string(),
    }
}

/// API 边界错误
///
/// 所有处理器返回结构化 JSON，内部异常只落日志，不外泄细节
#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub error: String,
    pub message: Option<String>,
    pub details: Vec<FieldError>,
}

/// 错误响应格式（仅用于 OpenAPI 文档）
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.error,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            message: None,
            details: Vec::new(),
        }
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
            message: None,
            details: Vec::new(),
        }
    }

    /// 校验失败：携带字段级错误明细
    pub fn validation_failed(details: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Validation failed".to_string(),
            message: None,
            details,
        }
    }

    /// 外部依赖失败：对外只给通用消息，上游原始错误已在调用方落日志
    pub fn external_service(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            error: error.into(),
            message: None,
            details: Vec::new(),
        }
    }

    /// 内部错误：细节只落日志，响应体保持通用
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", detail);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal server error".to_string(),
            message: None,
            details: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// 从 anyhow 错误转换
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

// 从 SQLx 错误转换
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),
            sqlx::Error::Database(ref db_err) => {
                if let Some(code) = db_err.code() {
                    if code == "23505" {
                        // PostgreSQL unique_violation
                        return Self::bad_request("Resource already exists");
                    }
                    if code == "23503" {
                        // PostgreSQL foreign_key_violation
                        return Self::bad_request("Foreign key constraint violation");
                    }
                }
                Self::internal(format!("Database error: {}", db_err))
            }
            _ => Self::internal(format!("Database operation failed: {}", err)),
        }
    }
}

// 地址生命周期服务错误 → HTTP 错误
impl From<AddressServiceError> for AppError {
    fn from(err: AddressServiceError) -> Self {
        match err {
            AddressServiceError::InvalidAddress => Self::bad_request("Invalid BTC address")
                .with_message("The provided address is not a valid Bitcoin address"),
            AddressServiceError::UnsupportedAddressType => {
                Self::bad_request("Unsupported address type")
                    .with_message("Only legacy, segwit and native segwit addresses are supported")
            }
            AddressServiceError::AddressAlreadyExists => {
                Self::bad_request("Address already exists")
                    .with_message("This BTC address is already imported")
            }
            AddressServiceError::AddressNotFound => Self::not_found("Address not found")
                .with_message("The specified BTC address was not found in the database"),
            AddressServiceError::WalletNotFound => Self::not_found("Wallet not found"),
            AddressServiceError::NoStoredSeed => Self::bad_request("No wallet seed stored")
                .with_message(
                    "Generate a batch first to create a wallet seed, or use seed_source=fresh",
                ),
            AddressServiceError::MnemonicAlreadyRevealed => {
                Self::bad_request("Mnemonic already revealed")
                    .with_message("The wallet mnemonic can only be revealed once")
            }
            AddressServiceError::MissingPrivateKey => Self::bad_request(
                "Private key required",
            )
            .with_message("Import without a private key is only allowed with watch_only=true"),
            AddressServiceError::InvalidBatchCount => Self::bad_request("Invalid address count")
                .with_message("Between 1 and 10 addresses can be generated at once"),
            AddressServiceError::Internal(err) => Self::internal(err),
        }
    }
}

// 服务商网关错误 → HTTP 错误
impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Transport(inner) => {
                tracing::error!("Provider transport error: {}", inner);
                Self::external_service("Payment provider unavailable")
            }
            ProviderError::Api { status, message } => {
                tracing::warn!("Provider rejected request ({}): {}", status, message);
                Self::bad_request("Provider request failed").with_message(message)
            }
        }
    }
}

impl From<CurrencyServiceError> for AppError {
    fn from(err: CurrencyServiceError) -> Self {
        match err {
            CurrencyServiceError::UnsupportedCurrency => {
                Self::bad_request("One or both currencies are not supported")
            }
            CurrencyServiceError::MalformedRates(detail) => {
                tracing::error!("Malformed rates payload: {}", detail);
                Self::external_service("Failed to get exchange rates")
            }
            CurrencyServiceError::Provider(inner) => inner.into(),
        }
    }
}

impl From<TransactionServiceError> for AppError {
    fn from(err: TransactionServiceError) -> Self {
        match err {
            TransactionServiceError::NotFound => Self::not_found("Transaction not found"),
            TransactionServiceError::DuplicateReference => {
                Self::bad_request("Transaction reference already exists")
            }
            TransactionServiceError::Internal(inner) => Self::internal(inner),
        }
    }
}
