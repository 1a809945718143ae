//! Paystack wire types.
//!
//! Only the fields the reconciliation flow reads are modelled; everything
//! else in the gateway payload is passed through untouched as JSON.

use serde::Deserialize;

/// Body of `GET /transaction/verify/{reference}`.
///
/// ```json
/// {
///   "status": true,
///   "message": "Verification successful",
///   "data": {
///     "status": "success",
///     "reference": "EFFIDELI_1_1000",
///     "amount": 2500000,
///     "customer": { "email": "ada@example.com", "first_name": "Ada" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<TransactionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionData {
    /// "success" or any other gateway status ("failed", "abandoned", ...).
    pub status: String,

    #[serde(default)]
    pub reference: Option<String>,

    /// Kobo.
    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Push notification body.
///
/// `data` stays untyped until the event name says what it holds.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `data` of a `charge.success` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeData {
    pub reference: String,
}
