// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the relay and their HTTP mapping.

use crate::validator::FieldError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Which delivery failed, for the response message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryContext {
    Forward,
    Confirmation,
}

impl DeliveryContext {
    fn message(self) -> &'static str {
        match self {
            Self::Forward => "Failed to forward message",
            Self::Confirmation => "Failed to send confirmation message",
        }
    }
}

/// Relay error types.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("This directory name is already taken. Please choose a different name.")]
    AlreadyExists,

    #[error("Rate limit exceeded. Please try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: u64 },

    #[error("{}: {}", .context.message(), .error)]
    DeliveryFailed {
        context: DeliveryContext,
        error: String,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl RelayError {
    /// Schema failure with per-field detail.
    pub fn invalid_fields(errors: Vec<FieldError>) -> Self {
        Self::InvalidInput {
            message: "Invalid input".to_string(),
            errors,
        }
    }

    /// Input failure described by a single message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } | Self::AlreadyExists => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::DeliveryFailed { .. } | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let display = self.to_string();
        match self {
            Self::InvalidInput { message, errors } if errors.is_empty() => {
                (status, Json(json!({ "message": message }))).into_response()
            }
            Self::InvalidInput { message, errors } => (
                status,
                Json(json!({ "message": message, "errors": errors })),
            )
                .into_response(),
            Self::RateLimited { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({ "message": display })),
            )
                .into_response(),
            Self::DeliveryFailed { context, error } => (
                status,
                Json(json!({ "message": context.message(), "error": error })),
            )
                .into_response(),
            Self::Unexpected(_) => (
                status,
                Json(json!({ "message": "An unexpected error occurred" })),
            )
                .into_response(),
            Self::AlreadyExists => (status, Json(json!({ "message": display }))).into_response(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidationError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RelayError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::AlreadyExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::RateLimited { retry_after_secs: 3 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            RelayError::DeliveryFailed {
                context: DeliveryContext::Forward,
                error: "timeout".into()
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::Unexpected("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_message_names_seconds() {
        let err = RelayError::RateLimited { retry_after_secs: 7 };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please try again in 7 seconds."
        );

        let response = err.into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");
    }

    #[test]
    fn test_invalid_fields_message() {
        let err = RelayError::invalid_fields(vec![FieldError::new(
            "message",
            ValidationError::MessageRequired,
        )]);
        assert_eq!(err.to_string(), "Invalid input");
    }
}
