//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Where clients are sent when a subscription token is rejected.
pub const LOGIN_REDIRECT: &str = "/subscription/login";

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation Errors**: malformed caller input (missing reference, bad email)
/// - **Resource Errors**: requested rows not found
/// - **Gateway Errors**: payment API unreachable or answering in an unexpected shape
/// - **Persistence Errors**: datastore reads/writes failed
/// - **Authentication Errors**: bad webhook signature, bad admin code, invalid token
/// - **Business Logic Errors**: locked weeks, forbidden status changes
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// Requested row does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The payment gateway could not be reached or answered with a non-2xx status.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The payment gateway answered but the payload was not what we expect.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Unexpected payment gateway response: {0}")]
    GatewayProtocol(String),

    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 500 and hides details from the client.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A datastore write or read failed outside of sqlx (constraint violations
    /// in the in-memory store, rows that no longer decode).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Webhook signature header missing or not matching the body.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Admin credential missing or wrong.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid access code")]
    AdminUnauthorized,

    /// Subscription token unknown or past its expiry.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid or expired access token")]
    TokenInvalid,

    /// Token is valid but no successful order backs it.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Subscription not found")]
    SubscriptionNotFound,

    /// Week outside 1..=4.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid week")]
    InvalidWeek,

    /// Week exists but has not unlocked yet.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("This week is not available yet")]
    WeekUnavailable,

    /// Status change other than pending -> terminal.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl AppError {
    /// Machine-readable code included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::GatewayUnavailable(_) => "gateway_unavailable",
            AppError::GatewayProtocol(_) => "gateway_protocol_error",
            AppError::Database(_) | AppError::Persistence(_) => "persistence_error",
            AppError::InvalidSignature => "invalid_signature",
            AppError::AdminUnauthorized => "admin_unauthorized",
            AppError::TokenInvalid => "token_invalid",
            AppError::SubscriptionNotFound => "subscription_not_found",
            AppError::InvalidWeek => "invalid_week",
            AppError::WeekUnavailable => "week_unavailable",
            AppError::InvalidTransition { .. } => "invalid_transition",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidWeek => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::GatewayUnavailable(_) | AppError::GatewayProtocol(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Database(_) | AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidSignature
            | AppError::AdminUnauthorized
            | AppError::TokenInvalid
            | AppError::SubscriptionNotFound => StatusCode::UNAUTHORIZED,
            AppError::WeekUnavailable => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }

    /// Both token failures mean "access denied" to the caller.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, AppError::TokenInvalid | AppError::SubscriptionNotFound)
    }

    /// Message safe to show to clients.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Persistence(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "success": false,
///   "error": "Human-readable error message",
///   "code": "error_type"
/// }
/// ```
///
/// Token failures also carry `"redirectUrl": "/subscription/login"`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::Database(_) | AppError::Persistence(_)) {
            tracing::error!(error = %self, "request failed with persistence error");
        }

        let mut body = json!({
            "success": false,
            "error": self.public_message(),
            "code": self.code(),
        });
        if self.is_access_denied() {
            body["redirectUrl"] = json!(LOGIN_REDIRECT);
        }

        (self.status(), Json(body)).into_response()
    }
}
