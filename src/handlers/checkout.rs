//! Checkout endpoint.
//!
//! - POST /api/orders - Create a pending order before opening the payment widget

use crate::{
    error::AppError,
    extractors::Json,
    models::order::CheckoutRequest,
    services::order_service,
    state::AppState,
};
use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

/// Everything the browser needs to open the Paystack widget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub reference: String,

    /// Naira.
    pub amount: i64,

    /// What the widget is charged with.
    pub amount_kobo: i64,

    pub email: String,
    pub public_key: Option<String>,
}

/// Create an order.
///
/// # Request Body
///
/// ```json
/// {
///   "email": "ada@example.com",
///   "firstName": "Ada",
///   "lastName": "Obi",
///   "phone": "08030000000",
///   "state": "Lagos",
///   "orderType": "download",
///   "apartmentType": "studio"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "success": true,
///   "reference": "EFFIDELI_482910334_1740819600000",
///   "amount": 15000,
///   "amountKobo": 1500000,
///   "email": "ada@example.com",
///   "publicKey": "pk_live_..."
/// }
/// ```
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, axum::Json<CheckoutResponse>), AppError> {
    let order = order_service::create_order(state.store.as_ref(), request, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        axum::Json(CheckoutResponse {
            success: true,
            amount_kobo: order.amount * 100,
            amount: order.amount,
            reference: order.reference,
            email: order.email,
            public_key: state.config.paystack_public_key.clone(),
        }),
    ))
}
