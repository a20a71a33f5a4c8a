// src/error.rs
//! Handler-boundary error taxonomy and its mapping onto the JSON envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::envelope::ApiResponse;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String },
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("authentication required")]
    Unauthorized,
    #[error("admin role required")]
    Forbidden,
    #[error("error while {operation}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        AppError::NotFound { entity }
    }

    /// For `map_err`: `.map_err(AppError::upstream("listing zones"))`.
    pub fn upstream(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| AppError::Upstream { operation, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Upstream { operation, source } = &self {
            // Provider text stays in the logs.
            tracing::error!(target: "api", %operation, error = %source, "upstream failure");
        }
        let status = self.status();
        (status, ApiResponse::<()>::failure(self.to_string())).into_response()
    }
}
