//! BTC 地址 API
//! 生成（单个/批量）、校验、详情、导入、余额与助记词一次性导出

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::response::{created_response, success_response, ApiResponse},
    app_state::AppState,
    domain::{AddressType, InferredNetwork},
    error::{field_error, AppError, FieldError},
    repository::{AddressStatus, BtcAddress, Wallet},
    service::btc_address_service::{qr_code_data, GenerateAddress, ImportAddress, SeedSource},
};

/// 完整派生路径格式：m/purpose'/coin'/account'/change/index
static DERIVATION_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^m/\d+'/\d+'/\d+'/\d+/\d+$").expect("derivation path regex"));

const MAX_BATCH_COUNT: u32 = 10;
const MAX_START_INDEX: u32 = 1_000_000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 请求/响应模型
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateAddressRequest {
    pub user_id: Uuid,
    /// 省略时默认 native_segwit
    pub address_type: Option<AddressType>,
    pub label: Option<String>,
    /// 自定义派生路径（仅 seed_source=fresh 时有效）
    pub derivation_path: Option<String>,
    /// fresh=全新助记词（默认）；wallet=从钱包种子继续派生
    #[serde(default)]
    pub seed_source: SeedSource,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedAddressResponse {
    pub address_id: Uuid,
    pub address: String,
    pub address_type: AddressType,
    pub public_key: Option<String>,
    pub derivation_path: Option<String>,
    pub label: Option<String>,
    /// 收款二维码载荷（bitcoin:<address>）
    pub qr_code: String,
}

impl GeneratedAddressResponse {
    fn from_model(address: &BtcAddress) -> Self {
        Self {
            address_id: address.address_id,
            address: address.address.clone(),
            address_type: address.address_type,
            public_key: address.public_key.clone(),
            derivation_path: address.derivation_path.clone(),
            label: address.label.clone(),
            qr_code: qr_code_data(&address.address),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateMultipleRequest {
    pub user_id: Uuid,
    /// 1-10
    pub count: u32,
    pub address_type: Option<AddressType>,
    #[serde(default)]
    pub start_index: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchAddressItem {
    pub address_id: Uuid,
    pub address: String,
    pub address_type: AddressType,
    pub derivation_path: Option<String>,
    pub index: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateMultipleResponse {
    pub addresses: Vec<BatchAddressItem>,
    pub count: usize,
    /// 助记词已加密落库，不随响应返回
    pub mnemonic_stored: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateAddressRequest {
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateAddressResponse {
    pub address: String,
    pub is_valid: bool,
    pub address_type: Option<AddressType>,
    pub network: InferredNetwork,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportAddressRequest {
    pub user_id: Uuid,
    pub address: String,
    pub private_key: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub watch_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportedAddressResponse {
    pub address_id: Uuid,
    pub address: String,
    pub address_type: AddressType,
    pub label: Option<String>,
    pub watch_only: bool,
    pub imported: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletInfo {
    pub wallet_id: Uuid,
    pub wallet_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressDetailsResponse {
    pub address_id: Uuid,
    pub address: String,
    pub address_type: AddressType,
    pub label: Option<String>,
    pub derivation_path: Option<String>,
    pub confirmed_balance: Decimal,
    pub unconfirmed_balance: Decimal,
    pub total_balance: Decimal,
    pub is_used: bool,
    pub is_change: bool,
    pub is_imported: bool,
    pub watch_only: bool,
    pub status: AddressStatus,
    pub created_at: DateTime<Utc>,
    pub wallet_info: WalletInfo,
}

impl AddressDetailsResponse {
    fn from_model(address: &BtcAddress, wallet: &Wallet) -> Self {
        Self {
            address_id: address.address_id,
            address: address.address.clone(),
            address_type: address.address_type,
            label: address.label.clone(),
            derivation_path: address.derivation_path.clone(),
            confirmed_balance: address.confirmed_balance,
            unconfirmed_balance: address.unconfirmed_balance,
            total_balance: address.total_balance(),
            is_used: address.is_used,
            is_change: address.is_change,
            is_imported: address.is_imported,
            watch_only: address.watch_only,
            status: address.status,
            created_at: address.created_at,
            wallet_info: WalletInfo {
                wallet_id: wallet.wallet_id,
                wallet_status: wallet.wallet_status.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: Decimal,
    pub confirmed_balance: Decimal,
    pub unconfirmed_balance: Decimal,
    /// bitnob / blockchain.info / database
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevealMnemonicRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevealMnemonicResponse {
    pub wallet_id: Uuid,
    pub mnemonic: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Routes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(generate_address))
        .route("/generate-multiple", post(generate_multiple_addresses))
        .route("/validate", post(validate_address))
        .route("/details/:address", get(get_address_details))
        .route("/import", post(import_address))
        .route("/balance/:address", get(get_address_balance))
        .route("/mnemonic/reveal", post(reveal_mnemonic))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 校验辅助
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn check_label(label: &Option<String>, details: &mut Vec<FieldError>) {
    if let Some(label) = label {
        if label.is_empty() || label.len() > 50 {
            details.push(field_error(
                "label",
                "Label must be between 1 and 50 characters",
                "invalid_length",
            ));
        }
    }
}

fn check_address_length(address: &str, details: &mut Vec<FieldError>) {
    if address.len() < 26 || address.len() > 62 {
        details.push(field_error(
            "address",
            "Invalid BTC address format",
            "invalid_length",
        ));
    }
}

/// 路径参数形式的地址只做长度预检，细校验交给服务层
fn check_address_param(address: &str) -> Result<(), AppError> {
    if address.len() < 26 || address.len() > 62 {
        return Err(AppError::bad_request("Invalid BTC address format"));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// POST /api/v1/address/generate
///
/// 生成一个新 BTC 地址；用户没有钱包时顺带创建
#[utoipa::path(
    post,
    path = "/api/v1/address/generate",
    request_body = GenerateAddressRequest,
    responses(
        (status = 201, description = "Address generated", body = ApiResponse<GeneratedAddressResponse>),
        (status = 400, description = "Validation or service failure", body = crate::error::ErrorResponse)
    ),
    tag = "BTC Address"
)]
pub async fn generate_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateAddressRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GeneratedAddressResponse>>), AppError> {
    let mut details = Vec::new();
    check_label(&req.label, &mut details);
    if let Some(path) = &req.derivation_path {
        if !DERIVATION_PATH_RE.is_match(path) {
            details.push(field_error(
                "derivation_path",
                "Derivation path must match m/purpose'/coin'/account'/change/index",
                "invalid_format",
            ));
        }
        if req.seed_source == SeedSource::Wallet {
            details.push(field_error(
                "derivation_path",
                "Custom derivation path is only valid with seed_source=fresh",
                "invalid_combination",
            ));
        }
    }
    if !details.is_empty() {
        return Err(AppError::validation_failed(details));
    }

    let address = state
        .address_service
        .generate(GenerateAddress {
            user_id: req.user_id,
            address_type: req.address_type.unwrap_or_default(),
            label: req.label,
            derivation_path: req.derivation_path,
            seed_source: req.seed_source,
        })
        .await?;

    created_response(
        GeneratedAddressResponse::from_model(&address),
        "BTC address generated successfully",
    )
}

/// POST /api/v1/address/generate-multiple
///
/// 批量生成地址；整个批次共享一个新助记词，助记词加密落库
#[utoipa::path(
    post,
    path = "/api/v1/address/generate-multiple",
    request_body = GenerateMultipleRequest,
    responses(
        (status = 201, description = "Addresses generated", body = ApiResponse<GenerateMultipleResponse>),
        (status = 400, description = "Validation or service failure", body = crate::error::ErrorResponse)
    ),
    tag = "BTC Address"
)]
pub async fn generate_multiple_addresses(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateMultipleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GenerateMultipleResponse>>), AppError> {
    let mut details = Vec::new();
    if req.count < 1 || req.count > MAX_BATCH_COUNT {
        details.push(field_error(
            "count",
            "Maximum 10 addresses can be generated at once",
            "out_of_range",
        ));
    }
    if req.start_index > MAX_START_INDEX {
        details.push(field_error(
            "start_index",
            "start_index is too large",
            "out_of_range",
        ));
    }
    if !details.is_empty() {
        return Err(AppError::validation_failed(details));
    }

    let batch = state
        .address_service
        .generate_multiple(
            req.user_id,
            req.count,
            req.address_type.unwrap_or_default(),
            req.start_index,
        )
        .await?;

    let addresses: Vec<BatchAddressItem> = batch
        .addresses
        .iter()
        .enumerate()
        .map(|(i, address)| BatchAddressItem {
            address_id: address.address_id,
            address: address.address.clone(),
            address_type: address.address_type,
            derivation_path: address.derivation_path.clone(),
            index: batch.start_index + i as u32,
        })
        .collect();
    let count = addresses.len();

    created_response(
        GenerateMultipleResponse {
            addresses,
            count,
            mnemonic_stored: true,
        },
        format!(
            "{} BTC addresses generated successfully; mnemonic stored encrypted, retrieve once via /address/mnemonic/reveal",
            count
        ),
    )
}

/// POST /api/v1/address/validate
///
/// 校验地址格式；格式错误返回 is_valid=false 而非报错
#[utoipa::path(
    post,
    path = "/api/v1/address/validate",
    request_body = ValidateAddressRequest,
    responses(
        (status = 200, description = "Validation result", body = ApiResponse<ValidateAddressResponse>),
        (status = 400, description = "Validation failure", body = crate::error::ErrorResponse)
    ),
    tag = "BTC Address"
)]
pub async fn validate_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateAddressRequest>,
) -> Result<Json<ApiResponse<ValidateAddressResponse>>, AppError> {
    let mut details = Vec::new();
    check_address_length(&req.address, &mut details);
    if !details.is_empty() {
        return Err(AppError::validation_failed(details));
    }

    let inspected = state.address_service.validate(&req.address);

    success_response(ValidateAddressResponse {
        address: req.address,
        is_valid: inspected.is_valid,
        address_type: inspected.address_type,
        network: inspected.network,
    })
}

/// GET /api/v1/address/details/{address}
///
/// 地址详情（连同所属钱包状态）
#[utoipa::path(
    get,
    path = "/api/v1/address/details/{address}",
    params(("address" = String, Path, description = "BTC address")),
    responses(
        (status = 200, description = "Address details", body = ApiResponse<AddressDetailsResponse>),
        (status = 400, description = "Bad address format", body = crate::error::ErrorResponse),
        (status = 404, description = "Address not found", body = crate::error::ErrorResponse)
    ),
    tag = "BTC Address"
)]
pub async fn get_address_details(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<AddressDetailsResponse>>, AppError> {
    check_address_param(&address)?;

    let (address, wallet) = state.address_service.get_details(&address).await?;

    success_response(AddressDetailsResponse::from_model(&address, &wallet))
}

/// POST /api/v1/address/import
///
/// 导入外部地址；watch_only 时不保留私钥
#[utoipa::path(
    post,
    path = "/api/v1/address/import",
    request_body = ImportAddressRequest,
    responses(
        (status = 201, description = "Address imported", body = ApiResponse<ImportedAddressResponse>),
        (status = 400, description = "Validation or service failure", body = crate::error::ErrorResponse)
    ),
    tag = "BTC Address"
)]
pub async fn import_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportAddressRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ImportedAddressResponse>>), AppError> {
    let mut details = Vec::new();
    check_address_length(&req.address, &mut details);
    check_label(&req.label, &mut details);
    if !details.is_empty() {
        return Err(AppError::validation_failed(details));
    }

    let imported = state
        .address_service
        .import(ImportAddress {
            user_id: req.user_id,
            address: req.address,
            private_key: req.private_key,
            label: req.label,
            watch_only: req.watch_only,
        })
        .await?;

    created_response(
        ImportedAddressResponse {
            address_id: imported.address_id,
            address: imported.address.clone(),
            address_type: imported.address_type,
            label: imported.label.clone(),
            watch_only: imported.watch_only,
            imported: true,
        },
        "BTC address imported successfully",
    )
}

/// GET /api/v1/address/balance/{address}
///
/// 余额查询：服务商 → 公共浏览器 → 数据库存量，逐层回退
#[utoipa::path(
    get,
    path = "/api/v1/address/balance/{address}",
    params(("address" = String, Path, description = "BTC address")),
    responses(
        (status = 200, description = "Balance with source tag", body = ApiResponse<BalanceResponse>),
        (status = 400, description = "Bad format or service failure", body = crate::error::ErrorResponse)
    ),
    tag = "BTC Address"
)]
pub async fn get_address_balance(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<BalanceResponse>>, AppError> {
    check_address_param(&address)?;

    let resolved = state.address_service.balance(&address).await?;

    success_response(BalanceResponse {
        address,
        balance: resolved.total(),
        confirmed_balance: resolved.confirmed_balance,
        unconfirmed_balance: resolved.unconfirmed_balance,
        source: resolved.source,
        note: resolved.note,
    })
}

/// POST /api/v1/address/mnemonic/reveal
///
/// 一次性导出批量生成时存储的助记词；再次调用被拒绝
#[utoipa::path(
    post,
    path = "/api/v1/address/mnemonic/reveal",
    request_body = RevealMnemonicRequest,
    responses(
        (status = 200, description = "Mnemonic revealed (once)", body = ApiResponse<RevealMnemonicResponse>),
        (status = 400, description = "Already revealed or no stored seed", body = crate::error::ErrorResponse),
        (status = 404, description = "Wallet not found", body = crate::error::ErrorResponse)
    ),
    tag = "BTC Address"
)]
pub async fn reveal_mnemonic(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RevealMnemonicRequest>,
) -> Result<Json<ApiResponse<RevealMnemonicResponse>>, AppError> {
    let (wallet_id, phrase) = state.address_service.reveal_mnemonic(req.user_id).await?;

    crate::api::response::success_response_with_message(
        RevealMnemonicResponse {
            wallet_id,
            mnemonic: phrase.to_string(),
        },
        "Store this mnemonic securely; it cannot be retrieved again",
    )
}
