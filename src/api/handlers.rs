//! 基础处理器：健康检查

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    api::response::{success_response, ApiResponse},
    app_state::AppState,
    error::AppError,
    infrastructure::db,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub network: String,
}

/// GET /healthz
///
/// 存活检查 + 数据库连通性
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthStatus>),
        (status = 502, description = "Database unreachable", body = crate::error::ErrorResponse)
    ),
    tag = "Health"
)]
pub async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthStatus>>, AppError> {
    db::health_check(&state.pool).await.map_err(|err| {
        tracing::error!("Health check failed: {}", err);
        AppError::external_service("Database unreachable")
    })?;

    success_response(HealthStatus {
        status: "ok",
        network: state.network.to_string(),
    })
}
