//! Payment verification - client-driven reconciliation against Paystack.
//!
//! This service handles:
//! - Verifying a reference with the gateway and applying the verdict locally
//! - Issuing dashboard access for paid subscriptions
//! - Working out where the browser goes next
//!
//! # Authority
//!
//! The gateway's answer is the truth. Local bookkeeping (status update, token
//! issue) is best-effort: failures are logged and the verification result is
//! still returned to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::AppError;
use crate::models::order::{MealPlan, NewOrder, Order, OrderDetails, OrderStatus};
use crate::models::paystack::{TransactionData, VerifyResponse};
use crate::services::access_service::create_subscription_access;
use crate::services::order_service::{self, normalize_email, validate_reference};
use crate::services::views::SUBSCRIPTION_DASHBOARD;
use crate::state::AppState;

/// Outcome of verifying one reference.
#[derive(Debug, Clone)]
pub struct Verification {
    /// Raw gateway payload, passed through to the client.
    pub data: Value,
    pub transaction: TransactionData,
    pub status: OrderStatus,

    /// Local order after reconciliation, if one exists.
    pub order: Option<Order>,

    /// Set when a paid subscription got its dashboard token.
    pub token: Option<String>,

    pub redirect_url: String,
}

/// Response body of `GET /api/verify-payment`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub data: Value,
    pub order_data: Option<Order>,
    pub redirect_url: String,
}

impl From<Verification> for VerifyPaymentResponse {
    fn from(v: Verification) -> Self {
        Self {
            success: true,
            data: v.data,
            order_data: v.order,
            redirect_url: v.redirect_url,
        }
    }
}

/// Ask the gateway about `reference` and reconcile the local order.
///
/// # Process
///
/// 1. Fetch the gateway verdict (`success` maps to success, anything else to failed)
/// 2. Move the local order out of `pending` if it exists
/// 3. For a paid subscription, issue a token and send the browser to the dashboard
/// 4. Otherwise pick a redirect by order kind
///
/// # Errors
///
/// - `Validation`: malformed reference
/// - `GatewayUnavailable`: gateway unreachable or non-2xx
/// - `GatewayProtocol`: payload not in the expected shape, `status: false`,
///   or the payload is about another reference
#[tracing::instrument(skip(state))]
pub async fn verify_payment(
    state: &AppState,
    reference: &str,
    now: DateTime<Utc>,
) -> Result<Verification, AppError> {
    let reference = validate_reference(reference)?;
    let data = state.gateway.verify_transaction(reference).await?;
    let transaction = parse_verification(&data, reference)?;

    let status = if transaction.status == "success" {
        OrderStatus::Success
    } else {
        OrderStatus::Failed
    };
    tracing::info!(gateway_status = %transaction.status, %status, "gateway verdict");

    let order = reconcile_best_effort(state, reference, status).await;

    let mut token = None;
    // The order's own status decides; a failed order stays failed whatever the gateway says
    let paid_subscription = order
        .as_ref()
        .filter(|o| o.details.is_subscription() && o.status == OrderStatus::Success);
    if let Some(order) = paid_subscription {
        match create_subscription_access(state.store.as_ref(), &order.email, Some(reference), now)
            .await
        {
            Ok(issued) => token = Some(issued),
            Err(e) => tracing::error!(error = %e, "failed to issue subscription token"),
        }
    }

    let redirect_url = match token.as_deref() {
        Some(token) => dashboard_url(token),
        None => {
            let customer_email = transaction
                .customer
                .as_ref()
                .and_then(|c| c.email.as_deref());
            redirect_for(reference, status, order.as_ref(), customer_email)
        }
    };

    Ok(Verification {
        data,
        transaction,
        status,
        order,
        token,
        redirect_url,
    })
}

fn parse_verification(data: &Value, reference: &str) -> Result<TransactionData, AppError> {
    let response: VerifyResponse = serde_json::from_value(data.clone())
        .map_err(|e| AppError::GatewayProtocol(format!("verify payload: {e}")))?;

    if !response.status {
        let message = response
            .message
            .unwrap_or_else(|| "verification was not successful".to_string());
        return Err(AppError::GatewayProtocol(message));
    }

    let transaction = response
        .data
        .ok_or_else(|| AppError::GatewayProtocol("verify payload has no data".to_string()))?;

    match transaction.reference.as_deref() {
        Some(echoed) if echoed != reference => Err(AppError::GatewayProtocol(format!(
            "verify payload is for reference {echoed}"
        ))),
        _ => Ok(transaction),
    }
}

/// Reconcile, swallowing local failures. Falls back to a plain read so the
/// redirect can still be chosen by order kind.
async fn reconcile_best_effort(
    state: &AppState,
    reference: &str,
    status: OrderStatus,
) -> Option<Order> {
    match order_service::reconcile_payment(
        state.store.as_ref(),
        state.views.as_ref(),
        reference,
        status,
    )
    .await
    {
        Ok(Some(reconciled)) => Some(reconciled.order),
        Ok(None) => {
            tracing::warn!("no local order for verified reference");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "local reconciliation failed");
            state
                .store
                .find_order_by_reference(reference)
                .await
                .ok()
                .flatten()
        }
    }
}

pub fn dashboard_url(token: &str) -> String {
    format!("{SUBSCRIPTION_DASHBOARD}?{}", query(&[("token", token)]))
}

pub fn success_url(reference: &str) -> String {
    format!("/payment/success?{}", query(&[("reference", reference)]))
}

fn failed_url(reference: &str) -> String {
    format!("/payment/failed?{}", query(&[("reference", reference)]))
}

fn query(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Where the browser goes after verification, when no dashboard token was issued.
pub fn redirect_for(
    reference: &str,
    status: OrderStatus,
    order: Option<&Order>,
    customer_email: Option<&str>,
) -> String {
    if status != OrderStatus::Success {
        return failed_url(reference);
    }

    let success = success_url(reference);
    let Some(order) = order else {
        return success;
    };

    match &order.details {
        OrderDetails::InfantRecipe { preferences } => format!(
            "/download/{reference}?{}",
            query(&[("preferences", preferences.join(",").as_str())])
        ),
        OrderDetails::Download { .. } => format!("/download/{reference}"),
        OrderDetails::Subscription { .. } => {
            let email = if order.email.is_empty() {
                customer_email.unwrap_or_default()
            } else {
                order.email.as_str()
            };
            format!(
                "/subscription?{}",
                query(&[("email", email), ("reference", reference)])
            )
        }
        OrderDetails::PrintDeliver { .. } => success,
    }
}

/// Redirect for `GET /api/payment-complete`, read from local state only.
///
/// Returns `(paid, redirect_url)`.
pub async fn completion_redirect(
    state: &AppState,
    reference: &str,
) -> Result<(bool, String), AppError> {
    let reference = validate_reference(reference)?;
    let order = state
        .store
        .find_order_by_reference(reference)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    if order.status != OrderStatus::Success {
        return Ok((false, failed_url(reference)));
    }

    let redirect = match &order.details {
        OrderDetails::InfantRecipe { preferences } if !preferences.is_empty() => format!(
            "/download/{reference}?{}",
            query(&[("preferences", preferences.join(",").as_str())])
        ),
        OrderDetails::InfantRecipe { .. } => format!("/download/{reference}"),
        _ => success_url(reference),
    };
    Ok((true, redirect))
}

/// Token and dashboard URL handed back by `GET /api/subscription/process`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionGrant {
    pub token: String,
    pub redirect_url: String,
}

/// Verify a subscription payment and make sure the subscriber can get in.
///
/// If the order row never got written at checkout it is rebuilt from the
/// gateway's customer data, inserted as `pending` and moved to `success`.
///
/// # Errors
///
/// - `Validation`: malformed email, the gateway says the payment did not succeed,
///   or the reference belongs to another kind of order
/// - `InvalidTransition`: the local order already settled as failed
/// - gateway errors from [`verify_payment`]
/// - `Persistence`/`Database`: rebuilding the order or issuing the token failed
#[tracing::instrument(skip(state, email))]
pub async fn handle_subscription_payment(
    state: &AppState,
    reference: &str,
    email: &str,
    now: DateTime<Utc>,
) -> Result<SubscriptionGrant, AppError> {
    let email = normalize_email(email)?;
    let verification = verify_payment(state, reference, now).await?;
    if verification.status != OrderStatus::Success {
        return Err(AppError::Validation("Payment was not successful".to_string()));
    }
    let reference = validate_reference(reference)?;

    let order = match state.store.find_order_by_reference(reference).await? {
        Some(order) => order,
        None => {
            rebuild_subscription_order(state, reference, &email, &verification.transaction).await?
        }
    };
    if !order.details.is_subscription() {
        return Err(AppError::Validation(
            "Reference does not belong to a subscription".to_string(),
        ));
    }
    if order.status != OrderStatus::Success {
        return Err(AppError::InvalidTransition {
            from: order.status.as_str(),
            to: OrderStatus::Success.as_str(),
        });
    }

    let token = match verification.token {
        Some(token) => token,
        None => create_subscription_access(state.store.as_ref(), &email, Some(reference), now).await?,
    };

    Ok(SubscriptionGrant {
        redirect_url: dashboard_url(&token),
        token,
    })
}

async fn rebuild_subscription_order(
    state: &AppState,
    reference: &str,
    email: &str,
    transaction: &TransactionData,
) -> Result<Order, AppError> {
    let customer = transaction.customer.clone().unwrap_or_default();
    let amount = transaction.amount.unwrap_or_default() / 100;

    let new_order = NewOrder {
        reference: reference.to_string(),
        email: email.to_string(),
        first_name: non_blank(customer.first_name.as_deref(), "Subscriber"),
        last_name: non_blank(customer.last_name.as_deref(), "User"),
        phone: non_blank(customer.phone.as_deref(), ""),
        state: String::new(),
        details: OrderDetails::Subscription {
            meal_plan: meal_plan_for_amount(amount),
        },
        amount,
    };

    let mut order = state.store.insert_order(&new_order).await?;
    order_service::update_order_status(
        state.store.as_ref(),
        state.views.as_ref(),
        order.id,
        OrderStatus::Success,
    )
    .await?;
    tracing::warn!(order_id = %order.id, amount, "rebuilt missing subscription order");
    order.status = OrderStatus::Success;

    Ok(order)
}

fn non_blank(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Best guess at the plan behind a paid amount; unknown amounts get the general plan.
fn meal_plan_for_amount(naira: i64) -> MealPlan {
    [MealPlan::General, MealPlan::Healthy, MealPlan::Both]
        .into_iter()
        .find(|plan| plan.price() == naira)
        .unwrap_or(MealPlan::General)
}
