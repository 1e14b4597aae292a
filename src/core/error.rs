//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 核心错误类型
///
/// 所有 handler 内部的校验错误都在这里被翻译成 HTTP 状态码和 JSON 错误体，
/// 不会再向上传播。
#[derive(Debug, Error)]
pub enum ApiError {
    /// id 不是合法的 UUID
    #[error("Invalid user ID (not UUID)")]
    InvalidIdentifier,
    /// 请求体是合法 JSON，但字段类型不符
    #[error("Invalid user data in request body")]
    InvalidPayload,
    /// 请求体无法解析为 JSON
    #[error("Malformed JSON or invalid request")]
    MalformedBody,
    #[error("User not found")]
    NotFound,
    #[error("Route not found: {method} {path}")]
    RouteNotFound { method: String, path: String },
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// 错误响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidIdentifier | ApiError::InvalidPayload | ApiError::MalformedBody => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound | ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}
