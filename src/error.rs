use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CometError>;

#[derive(Debug, thiserror::Error)]
pub enum CometError {
    /// Malformed or contradictory query parameters. The message is returned verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("{0:#}")]
    Store(#[from] anyhow::Error),

    #[error("Store queries did not complete within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Internal(String),
}

impl CometError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CometError::Validation(_) => StatusCode::BAD_REQUEST,
            CometError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CometError::Store(_) | CometError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl IntoResponse for CometError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut message = self.to_string();
        if message.is_empty() {
            message = format!("{:?}", self);
        }
        (status, Json(ErrorResponse::new(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CometError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CometError::Store(anyhow!("down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CometError::Timeout(Duration::from_secs(1)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = CometError::validation("Either \"lastN\" or \"hLimit/hOffset\" need to be used as query parameters");
        assert_eq!(
            err.to_string(),
            "Either \"lastN\" or \"hLimit/hOffset\" need to be used as query parameters"
        );
    }

    #[test]
    fn test_store_error_keeps_context_chain() {
        let err: CometError = anyhow!("connection refused")
            .context("Failed to query samples")
            .into();
        assert_eq!(err.to_string(), "Failed to query samples: connection refused");
    }

    #[test]
    fn test_empty_message_falls_back_to_debug() {
        let response = CometError::Internal(String::new()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
