//! 统一 API 响应格式
//!
//! 成功：{ success: true, message?, data }；
//! 错误格式（success: false + error/details）在 AppError 中实现

use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;

/// 统一成功响应格式
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// 辅助函数：200 成功响应
pub fn success_response<T: Serialize>(data: T) -> Result<Json<ApiResponse<T>>, AppError> {
    Ok(Json(ApiResponse::success(data)))
}

/// 辅助函数：200 成功响应（带消息）
pub fn success_response_with_message<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> Result<Json<ApiResponse<T>>, AppError> {
    Ok(Json(ApiResponse::success_with_message(data, message)))
}

/// 辅助函数：201 创建成功响应
pub fn created_response<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> Result<(StatusCode, Json<ApiResponse<T>>), AppError> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(data, message)),
    ))
}
