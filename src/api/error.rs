//! Mapping of conversion failures onto HTTP responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::core::ConversionError;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conversion(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::BadRequest(details) => ErrorResponse {
                error: "Invalid request".to_string(),
                details: Some(details),
            },
            ApiError::Conversion(e) if e.is_validation() => ErrorResponse {
                error: "Invalid request".to_string(),
                details: Some(e.to_string()),
            },
            // Upstream detail stays in the logs.
            ApiError::Conversion(e) => {
                error!(error = %e, source = ?std::error::Error::source(&e), "Conversion failed");
                ErrorResponse {
                    error: "Conversion failed".to_string(),
                    details: Some("unable to resolve exchange rate".to_string()),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
