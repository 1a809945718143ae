//! Subscription access tokens.
//!
//! Tokens are opaque bearer strings that let a subscriber back into the
//! download dashboard without a password. They are only ever appended; expiry
//! is the one way a token stops working.

use chrono::{DateTime, Months, Utc};
use sha2::{Digest, Sha256};

use crate::db::Store;
use crate::error::AppError;
use crate::models::order::OrderStatus;
use crate::models::subscription::{NewSubscriptionToken, SubscriptionAccess};
use crate::services::order_service::normalize_email;

/// Tokens stop working this many months after issue.
pub const TOKEN_VALIDITY_MONTHS: u32 = 12;

/// 256 bits from the thread-local CSPRNG, hex encoded (64 chars).
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// Mint and store a new token for a subscriber.
///
/// A missing reference is stored as an empty string; such a token can never
/// pass [`verify_subscription_access`] because no order has an empty reference.
///
/// # Errors
///
/// - `Persistence`/`Database`: the insert failed
#[tracing::instrument(skip(store, email))]
pub async fn create_subscription_access(
    store: &dyn Store,
    email: &str,
    reference: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let expires_at = now
        .checked_add_months(Months::new(TOKEN_VALIDITY_MONTHS))
        .ok_or_else(|| AppError::Validation("Token expiry is out of range".to_string()))?;

    let token = NewSubscriptionToken {
        email: email.to_string(),
        token: generate_token(),
        reference: reference.unwrap_or_default().to_string(),
        expires_at,
    };
    store.insert_token(&token).await?;
    tracing::info!(%expires_at, "subscription token issued");

    Ok(token.token)
}

/// Resolve a token to the subscription it grants access to.
///
/// # Errors
///
/// - `TokenInvalid`: unknown token, or `expires_at <= now`
/// - `SubscriptionNotFound`: the token's reference has no successful subscription order
pub async fn verify_subscription_access(
    store: &dyn Store,
    token: &str,
    now: DateTime<Utc>,
) -> Result<SubscriptionAccess, AppError> {
    if token.trim().is_empty() {
        return Err(AppError::TokenInvalid);
    }

    let row = store
        .find_unexpired_token(token, now)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let order = store
        .find_order_by_reference(&row.reference)
        .await?
        .filter(|order| order.details.is_subscription() && order.status == OrderStatus::Success)
        .ok_or(AppError::SubscriptionNotFound)?;

    Ok(SubscriptionAccess {
        email: row.email,
        reference: row.reference,
        subscription_date: order.created_at,
    })
}

/// A token recovered for a returning subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredAccess {
    pub token: String,
    pub reference: String,
}

/// Passwordless login: find the newest successful subscription for `email`
/// and hand back its newest live token, issuing one if none is left.
///
/// # Errors
///
/// - `Validation`: malformed email
/// - `NotFound`: no successful subscription order for this email
#[tracing::instrument(skip_all)]
pub async fn get_subscription_by_email(
    store: &dyn Store,
    email: &str,
    now: DateTime<Utc>,
) -> Result<RecoveredAccess, AppError> {
    let email = normalize_email(email)?;
    let order = store
        .latest_subscription_order(&email)
        .await?
        .ok_or(AppError::NotFound("Active subscription"))?;

    if let Some(existing) = store.latest_token(&email, &order.reference, now).await? {
        return Ok(RecoveredAccess {
            token: existing.token,
            reference: order.reference,
        });
    }

    let token = create_subscription_access(store, &email, Some(&order.reference), now).await?;
    Ok(RecoveredAccess {
        token,
        reference: order.reference,
    })
}

/// Store a legacy PIN on every token of (email, reference).
///
/// Only the SHA-256 digest is kept. Nothing reads it back.
///
/// # Errors
///
/// - `Validation`: PIN is not 4-6 digits, or email/reference is malformed
/// - `NotFound`: no token exists for the pair
#[tracing::instrument(skip(store, email, pin))]
pub async fn set_subscription_pin(
    store: &dyn Store,
    email: &str,
    reference: &str,
    pin: &str,
) -> Result<(), AppError> {
    let email = normalize_email(email)?;
    let reference = crate::services::order_service::validate_reference(reference)?;
    if !(4..=6).contains(&pin.len()) || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("PIN must be 4 to 6 digits".to_string()));
    }

    let digest = hex::encode(Sha256::digest(pin.as_bytes()));
    let touched = store.set_token_pin(&email, reference, &digest).await?;
    if touched == 0 {
        return Err(AppError::NotFound("Subscription token"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::order::{ApartmentType, MealPlan, NewOrder, OrderDetails};
    use chrono::Duration;

    async fn paid_subscription(store: &MemoryStore, reference: &str) {
        let order = store
            .insert_order(&NewOrder {
                reference: reference.to_string(),
                email: "ada@example.com".into(),
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                phone: "0803".into(),
                state: "Lagos".into(),
                details: OrderDetails::Subscription {
                    meal_plan: MealPlan::Healthy,
                },
                amount: 35_000,
            })
            .await
            .unwrap();
        store
            .set_status_if_pending(order.id, OrderStatus::Success)
            .await
            .unwrap();
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn issued_token_resolves_to_subscription() {
        let store = MemoryStore::new();
        paid_subscription(&store, "EFFIDELI_1_1000").await;
        let now = Utc::now();

        let token = create_subscription_access(&store, "ada@example.com", Some("EFFIDELI_1_1000"), now)
            .await
            .unwrap();
        let access = verify_subscription_access(&store, &token, now).await.unwrap();

        assert_eq!(access.email, "ada@example.com");
        assert_eq!(access.reference, "EFFIDELI_1_1000");
    }

    #[tokio::test]
    async fn paid_download_order_does_not_open_the_portal() {
        let store = MemoryStore::new();
        let order = store
            .insert_order(&NewOrder {
                reference: "EFFIDELI_2_1000".into(),
                email: "ada@example.com".into(),
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                phone: "0803".into(),
                state: "Lagos".into(),
                details: OrderDetails::Download {
                    apartment_type: ApartmentType::Studio,
                },
                amount: 15_000,
            })
            .await
            .unwrap();
        store
            .set_status_if_pending(order.id, OrderStatus::Success)
            .await
            .unwrap();
        let now = Utc::now();

        let token = create_subscription_access(&store, "ada@example.com", Some("EFFIDELI_2_1000"), now)
            .await
            .unwrap();
        let err = verify_subscription_access(&store, &token, now).await.unwrap_err();
        assert!(matches!(err, AppError::SubscriptionNotFound));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_even_with_paid_order() {
        let store = MemoryStore::new();
        paid_subscription(&store, "EFFIDELI_1_1000").await;
        let issued = Utc::now();

        let token = create_subscription_access(&store, "ada@example.com", Some("EFFIDELI_1_1000"), issued)
            .await
            .unwrap();
        let expiry = issued.checked_add_months(Months::new(12)).unwrap();

        assert!(verify_subscription_access(&store, &token, expiry - Duration::seconds(1))
            .await
            .is_ok());
        for at in [expiry, expiry + Duration::days(1)] {
            let err = verify_subscription_access(&store, &token, at).await.unwrap_err();
            assert!(matches!(err, AppError::TokenInvalid));
        }
    }

    #[tokio::test]
    async fn token_without_paid_order_is_not_a_subscription() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let token = create_subscription_access(&store, "ada@example.com", None, now)
            .await
            .unwrap();

        let err = verify_subscription_access(&store, &token, now).await.unwrap_err();
        assert!(matches!(err, AppError::SubscriptionNotFound));

        let err = verify_subscription_access(&store, "nope", now).await.unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }

    #[tokio::test]
    async fn login_reuses_live_token_then_issues_new_one() {
        let store = MemoryStore::new();
        paid_subscription(&store, "EFFIDELI_1_1000").await;
        let now = Utc::now();

        let first = get_subscription_by_email(&store, "ADA@example.com", now).await.unwrap();
        let again = get_subscription_by_email(&store, "ada@example.com", now).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(first.reference, "EFFIDELI_1_1000");
        assert_eq!(store.token_count(), 1);

        let much_later = now + Duration::days(400);
        let renewed = get_subscription_by_email(&store, "ada@example.com", much_later)
            .await
            .unwrap();
        assert_ne!(renewed.token, first.token);
        assert_eq!(store.token_count(), 2);
    }

    #[tokio::test]
    async fn login_without_subscription_is_not_found() {
        let store = MemoryStore::new();
        let err = get_subscription_by_email(&store, "ada@example.com", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn pin_is_stored_as_digest() {
        let store = MemoryStore::new();
        create_subscription_access(&store, "ada@example.com", Some("EFFIDELI_1_1000"), Utc::now())
            .await
            .unwrap();

        assert!(matches!(
            set_subscription_pin(&store, "ada@example.com", "EFFIDELI_1_1000", "12a4").await,
            Err(AppError::Validation(_))
        ));
        set_subscription_pin(&store, "ada@example.com", "EFFIDELI_1_1000", "1234")
            .await
            .unwrap();

        let pins = store.token_pins();
        assert_eq!(pins.len(), 1);
        let stored = pins[0].as_deref().unwrap();
        assert_ne!(stored, "1234");
        assert_eq!(stored.len(), 64);

        assert!(matches!(
            set_subscription_pin(&store, "ada@example.com", "EFFIDELI_2_1000", "1234").await,
            Err(AppError::NotFound(_))
        ));
    }
}
