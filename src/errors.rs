use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Provider { code: &'static str, message: String },
    #[error("{message}")]
    Internal { code: &'static str, message: String },
    #[error("no such session")]
    SessionNotFound,
    #[error("invalid json body")]
    InvalidBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            code: "provider_error",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Provider { code, message } => {
                tracing::warn!(error = %message, "upstream provider request failed");
                (StatusCode::BAD_GATEWAY, code, message)
            }
            Self::Internal { code, message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "internal server error".to_string(),
                )
            }
            Self::SessionNotFound => (
                StatusCode::NOT_FOUND,
                "session_not_found",
                "no such session".to_string(),
            ),
            Self::InvalidBody => (
                StatusCode::BAD_REQUEST,
                "invalid_body",
                "request body must be a JSON-RPC request".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
                details: json!({}),
            }),
        )
            .into_response()
    }
}
