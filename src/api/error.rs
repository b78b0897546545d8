use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::EngineError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// 接口错误：状态码 + 消息
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            _ if !err.is_client_error() => STATUS_INTERNAL_ERROR,
            EngineError::NotFound { .. } => STATUS_NOT_FOUND,
            _ => STATUS_BAD_REQUEST,
        };
        if err.is_client_error() {
            warn!(status, error = %err, "request rejected");
        } else {
            error!(error = %err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// 接口响应，`body` 为空表示无内容
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: STATUS_OK,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: STATUS_NO_CONTENT,
            body: None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<ApiResponse<T>, ApiError>;
