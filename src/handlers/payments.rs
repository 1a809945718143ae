//! Payment verification endpoints.
//!
//! - GET /api/verify-payment?reference= - Verify with Paystack and reconcile
//! - GET /api/payment-complete?reference=|trxref= - Redirect from local order state

use crate::{
    error::AppError,
    extractors::Query,
    services::payment_service::{self, VerifyPaymentResponse},
    state::AppState,
};
use axum::{Json, extract::State, response::IntoResponse, response::Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct ReferenceQuery {
    pub reference: Option<String>,

    /// Paystack's name for the reference on its callback redirect.
    pub trxref: Option<String>,
}

impl ReferenceQuery {
    fn reference(&self) -> Result<&str, AppError> {
        self.reference
            .as_deref()
            .or(self.trxref.as_deref())
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Reference is required".to_string()))
    }
}

/// Verify a payment.
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "data": { "status": true, "data": { "status": "success", ... } },
///   "orderData": { "reference": "EFFIDELI_1_1000", "status": "success", ... },
///   "redirectUrl": "/subscription/dashboard?token=..."
/// }
/// ```
///
/// # Errors
///
/// - 400 no reference
/// - 502 gateway unreachable or answering nonsense
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<ReferenceQuery>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let reference = query.reference()?;
    let verification = payment_service::verify_payment(&state, reference, Utc::now()).await?;
    Ok(Json(verification.into()))
}

/// Where to send the browser once the widget closes.
///
/// Unknown references still get a redirect, to the generic success page,
/// because the gateway may have accepted a payment we never recorded.
pub async fn payment_complete(
    State(state): State<AppState>,
    Query(query): Query<ReferenceQuery>,
) -> Result<Response, AppError> {
    let reference = query.reference()?;

    match payment_service::completion_redirect(&state, reference).await {
        Ok((paid, redirect_url)) => Ok(Json(json!({
            "success": paid,
            "redirectUrl": redirect_url,
        }))
        .into_response()),
        Err(AppError::NotFound(_)) => Ok(Json(json!({
            "success": false,
            "error": "Order not found",
            "redirectUrl": payment_service::success_url(reference),
        }))
        .into_response()),
        Err(e) => Err(e),
    }
}
