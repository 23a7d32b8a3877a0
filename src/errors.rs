//! Failures that cannot be reported through a flash redirect.
//!
//! Upload rejections and write failures never reach this type: they are
//! flashed back to the form. What is left is the server failing to build the
//! redirect itself.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// The flash payload could not be serialized into its cookie.
    #[error("failed to encode flash message: {0}")]
    FlashEncoding(#[from] serde_json::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::FlashEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = status.as_u16(), "request failed: {}", self);

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[tokio::test]
    async fn flash_encoding_failure_is_a_json_500() {
        let source = serde_json::from_str::<Value>("{not json").unwrap_err();
        let response = AppError::from(source).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 500);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("failed to encode flash message")
        );
    }
}
