//! Paystack webhook handling.
//!
//! This module verifies the HMAC signature Paystack puts on every push
//! notification and applies `charge.success` events to the order store.
//!
//! # Delivery Semantics
//!
//! Paystack retries deliveries and gives no ordering guarantee. Applying a
//! `charge.success` twice lands on the same row state as applying it once,
//! because the status write is set-if-different and pending-only.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::AppError;
use crate::models::order::{OrderStatus, StatusChange};
use crate::models::paystack::{ChargeData, WebhookEvent};
use crate::services::order_service;
use crate::state::AppState;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the hex HMAC-SHA512 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// The one event that changes local state.
pub const CHARGE_SUCCESS: &str = "charge.success";

/// Check `signature` against HMAC-SHA512(secret, body).
///
/// # Security
///
/// - Computed over the raw bytes as received, never a re-serialization
/// - Constant-time comparison via `Mac::verify_slice`
/// - Missing or non-hex signatures are rejected the same way as wrong ones
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), AppError> {
    let expected = signature
        .map(str::trim)
        .and_then(|s| hex::decode(s).ok())
        .ok_or(AppError::InvalidSignature)?;

    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).map_err(|_| AppError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| AppError::InvalidSignature)
}

/// Hex signature the way Paystack computes it.
#[cfg(test)]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// What happened to an authenticated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// `charge.success` moved (or confirmed) the order.
    Applied(StatusChange),

    /// `charge.success` for a reference with no local order.
    UnknownReference,

    /// `charge.success` for an order already settled the other way.
    Conflicting,

    /// Any other event type.
    Ignored,
}

/// Authenticate and apply one webhook delivery.
///
/// # Errors
///
/// - `InvalidSignature`: signature missing or wrong; nothing is read or written
/// - `Validation`: signed body is not a webhook event
/// - `Persistence`/`Database`: the status write failed (Paystack will retry)
#[tracing::instrument(skip_all)]
pub async fn handle_event(
    state: &AppState,
    body: &[u8],
    signature: Option<&str>,
) -> Result<WebhookOutcome, AppError> {
    verify_signature(&state.config.paystack_secret_key, body, signature)?;

    let event: WebhookEvent = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Malformed webhook body: {e}")))?;

    if event.event != CHARGE_SUCCESS {
        tracing::debug!(event = %event.event, "ignoring webhook event");
        return Ok(WebhookOutcome::Ignored);
    }

    let charge: ChargeData = serde_json::from_value(event.data)
        .map_err(|e| AppError::Validation(format!("Malformed charge data: {e}")))?;
    let reference = order_service::validate_reference(&charge.reference)?;

    match order_service::reconcile_payment(
        state.store.as_ref(),
        state.views.as_ref(),
        reference,
        OrderStatus::Success,
    )
    .await
    {
        Ok(Some(reconciled)) => {
            tracing::info!(reference, change = ?reconciled.change, "charge applied");
            Ok(WebhookOutcome::Applied(reconciled.change))
        }
        Ok(None) => {
            tracing::warn!(reference, "charge for unknown reference");
            Ok(WebhookOutcome::UnknownReference)
        }
        Err(e @ AppError::InvalidTransition { .. }) => {
            tracing::warn!(reference, error = %e, "charge conflicts with settled order");
            Ok(WebhookOutcome::Conflicting)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::CheckoutRequest;
    use crate::services::order_service::create_order;
    use crate::test_support::TestApp;
    use chrono::Utc;

    const SECRET: &str = "sk_test_secret";

    fn charge_body(reference: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "event": "charge.success",
            "data": { "reference": reference, "amount": 2_500_000, "status": "success" }
        }))
        .unwrap()
    }

    async fn pending_order(app: &TestApp, reference: &str) -> uuid::Uuid {
        create_order(
            app.state.store.as_ref(),
            CheckoutRequest {
                reference: Some(reference.to_string()),
                email: "ada@example.com".into(),
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                phone: "0803".into(),
                order_type: "subscription".into(),
                meal_plan: Some("general".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap()
        .id
    }

    #[test]
    fn signature_round_trip() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = sign(SECRET, body);
        assert_eq!(signature.len(), 128);
        assert!(verify_signature(SECRET, body, Some(&signature)).is_ok());
        assert!(verify_signature("other", body, Some(&signature)).is_err());
        assert!(verify_signature(SECRET, b"{}", Some(&signature)).is_err());
        assert!(verify_signature(SECRET, body, Some("zz")).is_err());
        assert!(verify_signature(SECRET, body, None).is_err());
    }

    #[tokio::test]
    async fn bad_signature_changes_nothing() {
        let app = TestApp::new();
        let id = pending_order(&app, "EFFIDELI_1_1000").await;
        let body = charge_body("EFFIDELI_1_1000");

        let err = handle_event(&app.state, &body, Some(&sign("wrong", &body)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));

        let order = app.state.store.find_order(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(app.views.paths().is_empty());
    }

    #[tokio::test]
    async fn redelivery_is_idempotent() {
        let app = TestApp::new();
        let id = pending_order(&app, "EFFIDELI_1_1000").await;
        let body = charge_body("EFFIDELI_1_1000");
        let signature = sign(SECRET, &body);

        let first = handle_event(&app.state, &body, Some(&signature)).await.unwrap();
        assert_eq!(first, WebhookOutcome::Applied(StatusChange::Updated));
        let after_first = app.state.store.find_order(id).await.unwrap().unwrap();

        let second = handle_event(&app.state, &body, Some(&signature)).await.unwrap();
        assert_eq!(second, WebhookOutcome::Applied(StatusChange::Unchanged));
        let after_second = app.state.store.find_order(id).await.unwrap().unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second.status, OrderStatus::Success);
    }

    #[tokio::test]
    async fn other_events_are_ignored() {
        let app = TestApp::new();
        let body = br#"{"event":"transfer.failed","data":{"reference":"X"}}"#;
        let outcome = handle_event(&app.state, body, Some(&sign(SECRET, body)))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn unknown_and_settled_references_are_acknowledged() {
        let app = TestApp::new();
        let body = charge_body("EFFIDELI_9_1000");
        let outcome = handle_event(&app.state, &body, Some(&sign(SECRET, &body)))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::UnknownReference);

        let id = pending_order(&app, "EFFIDELI_2_1000").await;
        app.state
            .store
            .set_status_if_pending(id, OrderStatus::Failed)
            .await
            .unwrap();
        let body = charge_body("EFFIDELI_2_1000");
        let outcome = handle_event(&app.state, &body, Some(&sign(SECRET, &body)))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Conflicting);
    }

    #[tokio::test]
    async fn signed_garbage_is_a_validation_error() {
        let app = TestApp::new();
        let body = b"not json";
        let err = handle_event(&app.state, body, Some(&sign(SECRET, body)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
