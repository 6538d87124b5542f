use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ParamInvalid,
    MethodUnsupported,
    AlreadyOpen,
    UrlInvalid,
    OperationDisabled,
}

/// Synchronous failure raised at the application call that violated the
/// host contract. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn param_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParamInvalid, message)
    }

    pub fn method_unsupported(method: &str, version: &str) -> Self {
        Self::new(
            ErrorCode::MethodUnsupported,
            format!("{method} is not supported in version {version}"),
        )
    }

    pub fn already_open(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyOpen, message)
    }

    pub fn url_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UrlInvalid, message)
    }

    pub fn operation_disabled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OperationDisabled, message)
    }
}
