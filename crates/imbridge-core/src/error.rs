//! 桥接服务错误类型
//!
//! 缓存目录、传输状态和 HTTP 服务共用的错误分类。
//! 导出流水线使用独立的 [`crate::export::ExportError`]。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;

/// 桥接错误
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl BridgeError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::InvalidName(_) | BridgeError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::Io(_) | BridgeError::Bind { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
