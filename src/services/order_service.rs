//! Order service - checkout, status transitions and reconciliation.
//!
//! This service handles:
//! - Validating checkout input and pricing orders server-side
//! - Generating and validating gateway references
//! - The pending -> terminal status transition, shared by the admin API,
//!   client-driven payment verification and the gateway webhook
//! - Aggregate stats for the admin dashboard
//!
//! # Convergence
//!
//! The webhook and the client verification path race to write the same row.
//! Both only ever move a `pending` row to the gateway's terminal status, and
//! writing a status the row already has is a no-op, so the two paths converge
//! on the same final row whichever lands first.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::db::Store;
use crate::error::AppError;
use crate::models::order::{
    CheckoutRequest, NewOrder, Order, OrderStats, OrderStatus, StatusChange,
};
use crate::services::views::{ADMIN_ORDERS, ORDERS, ViewInvalidator, admin_order};

/// Prefix of server-generated references.
pub const REFERENCE_PREFIX: &str = "EFFIDELI";

const MAX_REFERENCE_LEN: usize = 100;

/// Generate a reference in the `EFFIDELI_<random>_<unix millis>` format.
pub fn generate_reference(now: DateTime<Utc>) -> String {
    let random: u32 = rand::rng().random_range(0..1_000_000_000);
    format!("{REFERENCE_PREFIX}_{random}_{}", now.timestamp_millis())
}

/// Loose check for references arriving from the gateway or query strings.
///
/// Gateway-issued references are not guaranteed to follow our format, so this
/// only rejects values that could not be a reference at all.
pub fn validate_reference(reference: &str) -> Result<&str, AppError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(AppError::Validation("Reference is required".to_string()));
    }
    if reference.len() > MAX_REFERENCE_LEN
        || !reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '='))
    {
        return Err(AppError::Validation("Reference is malformed".to_string()));
    }
    Ok(reference)
}

/// Strict check for client-generated checkout references: `PREFIX_<digits>_<digits>`.
pub fn validate_checkout_reference(reference: &str) -> Result<&str, AppError> {
    let reference = validate_reference(reference)?;
    let mut parts = reference.split('_');
    let well_formed = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(prefix), Some(random), Some(timestamp), None) => {
            !prefix.is_empty()
                && prefix
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
                && is_digits(random)
                && is_digits(timestamp)
        }
        _ => false,
    };

    if !well_formed {
        return Err(AppError::Validation(
            "Reference must look like PREFIX_<random>_<timestamp>".to_string(),
        ));
    }
    Ok(reference)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Trim and lowercase an email, rejecting values that are clearly not one.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation("A valid email is required".to_string()))
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Validate a checkout request and insert it as a `pending` order.
///
/// The amount is always computed from the order details; clients never send it.
///
/// # Errors
///
/// - `Validation`: missing or malformed fields
/// - `Persistence`/`Database`: the insert failed (duplicate reference, connectivity)
#[tracing::instrument(skip_all, fields(order_type = %request.order_type))]
pub async fn create_order(
    store: &dyn Store,
    request: CheckoutRequest,
    now: DateTime<Utc>,
) -> Result<Order, AppError> {
    let details = request.details()?;
    let reference = match request.reference.as_deref() {
        Some(reference) => validate_checkout_reference(reference)?.to_string(),
        None => generate_reference(now),
    };

    let new_order = NewOrder {
        reference,
        email: normalize_email(&request.email)?,
        first_name: required("firstName", &request.first_name)?,
        last_name: required("lastName", &request.last_name)?,
        phone: required("phone", &request.phone)?,
        state: request.state.trim().to_string(),
        amount: details.amount(),
        details,
    };

    let order = store.insert_order(&new_order).await?;
    tracing::info!(reference = %order.reference, amount = order.amount, "order created");

    Ok(order)
}

/// Move an order to `status`, looked up by primary key.
///
/// Views showing the order and the order list are revalidated when the row changes.
///
/// # Errors
///
/// - `NotFound`: no order with this id
/// - `InvalidTransition`: the order is already in a different terminal status,
///   or the target is `pending`
#[tracing::instrument(skip(store, views))]
pub async fn update_order_status(
    store: &dyn Store,
    views: &dyn ViewInvalidator,
    id: Uuid,
    status: OrderStatus,
) -> Result<StatusChange, AppError> {
    let order = store
        .find_order(id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let change = transition(store, &order, status).await?;
    if change == StatusChange::Updated {
        views.revalidate(ADMIN_ORDERS);
        views.revalidate(&admin_order(id));
    }

    Ok(change)
}

/// An order after reconciliation against the gateway.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub order: Order,
    pub change: StatusChange,
}

/// Apply the gateway's verdict to the order with this reference.
///
/// Returns `Ok(None)` when no local order exists; the gateway's answer still
/// stands in that case, there is just nothing to update.
#[tracing::instrument(skip(store, views))]
pub async fn reconcile_payment(
    store: &dyn Store,
    views: &dyn ViewInvalidator,
    reference: &str,
    status: OrderStatus,
) -> Result<Option<Reconciled>, AppError> {
    let Some(mut order) = store.find_order_by_reference(reference).await? else {
        return Ok(None);
    };

    let change = transition(store, &order, status).await?;
    if change == StatusChange::Updated {
        views.revalidate(ORDERS);
        views.revalidate(ADMIN_ORDERS);
        views.revalidate(&admin_order(order.id));
        tracing::info!(order_id = %order.id, %status, "order reconciled");
    }
    order.status = status;

    Ok(Some(Reconciled { order, change }))
}

/// Set-if-different with the pending-only rule.
async fn transition(
    store: &dyn Store,
    order: &Order,
    target: OrderStatus,
) -> Result<StatusChange, AppError> {
    if order.status == target {
        return Ok(StatusChange::Unchanged);
    }
    if order.status.is_terminal() || !target.is_terminal() {
        return Err(AppError::InvalidTransition {
            from: order.status.as_str(),
            to: target.as_str(),
        });
    }

    if store.set_status_if_pending(order.id, target).await? {
        return Ok(StatusChange::Updated);
    }

    // Lost a race with the other reconciliation path; see where the row ended up
    match store.find_order(order.id).await? {
        None => Err(AppError::NotFound("Order")),
        Some(current) if current.status == target => Ok(StatusChange::Unchanged),
        Some(current) => Err(AppError::InvalidTransition {
            from: current.status.as_str(),
            to: target.as_str(),
        }),
    }
}

/// Counts by status and revenue from successful orders.
pub async fn get_order_stats(store: &dyn Store) -> Result<OrderStats, AppError> {
    store.order_stats().await
}
