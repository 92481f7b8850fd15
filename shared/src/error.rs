use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Failure categories exposed over HTTP. The `Display` text is the `message`
/// field of the response body.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("invalid request")]
    InvalidInput,
    #[error("not found")]
    NotFound,
    #[error("failed")]
    SystemError,
}

impl ErrorCode {
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::SystemError => 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.to_string(),
            error: None,
        }
    }

    pub fn with_details(code: ErrorCode, details: impl Into<String>) -> Self {
        Self {
            message: code.to_string(),
            error: Some(details.into()),
        }
    }
}
