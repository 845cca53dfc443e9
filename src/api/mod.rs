use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app_state::AppState;

pub mod address_api;
pub mod currency_api;
pub mod handlers;
pub mod response;
pub mod transaction_api;
pub mod wallet_api;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::healthz,
        address_api::generate_address,
        address_api::generate_multiple_addresses,
        address_api::validate_address,
        address_api::get_address_details,
        address_api::import_address,
        address_api::get_address_balance,
        address_api::reveal_mnemonic,
        wallet_api::create_wallet,
        wallet_api::list_wallets,
        wallet_api::get_wallet_by_coin,
        currency_api::get_currency_rate,
        currency_api::get_exchange_rates,
        currency_api::convert_currency,
        transaction_api::create_transaction,
        transaction_api::list_transactions,
        transaction_api::get_transaction,
        transaction_api::update_transaction_status,
    ),
    components(schemas(
        crate::domain::AddressType,
        crate::domain::InferredNetwork,
        crate::error::ErrorResponse,
        crate::error::FieldError,
        crate::repository::AddressStatus,
        crate::repository::TxnStatus,
        crate::repository::TxnType,
        crate::service::btc_address_service::SeedSource,
        crate::service::currency_service::ConversionResult,
        handlers::HealthStatus,
        address_api::GenerateAddressRequest,
        address_api::GeneratedAddressResponse,
        address_api::GenerateMultipleRequest,
        address_api::GenerateMultipleResponse,
        address_api::BatchAddressItem,
        address_api::ValidateAddressRequest,
        address_api::ValidateAddressResponse,
        address_api::ImportAddressRequest,
        address_api::ImportedAddressResponse,
        address_api::AddressDetailsResponse,
        address_api::WalletInfo,
        address_api::BalanceResponse,
        address_api::RevealMnemonicRequest,
        address_api::RevealMnemonicResponse,
        wallet_api::CreateWalletRequest,
        currency_api::ConvertRequest,
        transaction_api::CreateTransactionRequest,
        transaction_api::UpdateTransactionStatusRequest,
        transaction_api::TransactionResponse,
    )),
    tags(
        (name = "BTC Address", description = "BTC 地址生成、导入与余额"),
        (name = "Wallets", description = "服务商托管钱包"),
        (name = "Currency", description = "汇率查询与换算"),
        (name = "Transactions", description = "交易记录"),
        (name = "Health", description = "健康检查")
    )
)]
pub struct ApiDoc;

/// 构建应用路由
pub fn router(state: Arc<AppState>) -> Router {
    let api_v1 = Router::new()
        .nest("/address", address_api::routes())
        .nest("/wallets", wallet_api::routes())
        .nest("/currency", currency_api::routes())
        .nest("/transactions", transaction_api::routes());

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
