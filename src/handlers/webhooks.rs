//! Paystack webhook endpoint.
//!
//! - POST /api/webhook/paystack
//!
//! The body is taken as raw bytes so the signature is checked against exactly
//! what Paystack signed.

use crate::{
    error::AppError,
    services::webhook_service::{self, SIGNATURE_HEADER},
    state::AppState,
};
use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};

/// Receive a push notification.
///
/// # Headers
///
/// ```
/// x-paystack-signature: <hex HMAC-SHA512 of the body>
/// ```
///
/// # Response (200)
///
/// ```json
/// { "received": true }
/// ```
///
/// Any authenticated event is acknowledged, including ones we do not act on.
///
/// # Errors
///
/// - 401 signature missing or wrong (no state is touched)
/// - 500 datastore failure (Paystack retries)
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = webhook_service::handle_event(&state, &body, signature).await?;
    tracing::debug!(?outcome, "webhook handled");

    Ok(Json(json!({ "received": true })))
}
