//! Subscription portal endpoints.
//!
//! - GET /api/subscription/process?email=&reference= - Verify payment and grant access
//! - POST /api/subscription/login - Recover a token by email
//! - GET /api/subscription/status?token= - Dashboard data
//! - POST /api/subscription/download - Unlocked week's PDF
//! - POST /api/subscription/feedback - Append feedback
//! - POST /api/subscription/pin - Legacy PIN, write-only
//!
//! Token failures answer 401 with `redirectUrl: "/subscription/login"`.

use crate::{
    error::AppError,
    extractors::{Json, Query},
    models::subscription::{
        DownloadRequest, FeedbackRequest, LoginRequest, PinRequest, ProcessSubscriptionQuery,
        SubscriptionStatus, TokenQuery, TokenResponse, WeeklyPlanResponse,
    },
    services::{access_service, ledger_service, payment_service},
    state::AppState,
};
use axum::extract::State;
use chrono::Utc;
use serde_json::{Value, json};

/// Grant dashboard access after a subscription payment.
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "token": "9f1c...",
///   "redirectUrl": "/subscription/dashboard?token=9f1c..."
/// }
/// ```
pub async fn process_subscription(
    State(state): State<AppState>,
    Query(query): Query<ProcessSubscriptionQuery>,
) -> Result<axum::Json<TokenResponse>, AppError> {
    let (Some(email), Some(reference)) = (query.email.as_deref(), query.reference.as_deref())
    else {
        return Err(AppError::Validation(
            "Email and reference are required".to_string(),
        ));
    };

    let grant =
        payment_service::handle_subscription_payment(&state, reference, email, Utc::now()).await?;

    Ok(axum::Json(TokenResponse {
        success: true,
        token: grant.token,
        reference: None,
        redirect_url: Some(grant.redirect_url),
    }))
}

/// Passwordless login for returning subscribers.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<axum::Json<TokenResponse>, AppError> {
    let access =
        access_service::get_subscription_by_email(state.store.as_ref(), &request.email, Utc::now())
            .await?;

    Ok(axum::Json(TokenResponse {
        success: true,
        token: access.token,
        reference: Some(access.reference),
        redirect_url: None,
    }))
}

/// Dashboard data for a token.
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "email": "ada@example.com",
///   "reference": "EFFIDELI_1_1000",
///   "weeks": [
///     { "week": 1, "available": true, "downloaded": true, "accessDate": "2025-03-01T09:00:00Z" },
///     { "week": 2, "available": false, "downloaded": false, "accessDate": "2025-03-08T09:00:00Z" }
///   ],
///   "images": ["https://.../subscription/week1-preview.jpeg"],
///   "allDownloaded": true,
///   "subscriptionStatus": "active",
///   "subscriptionEndDate": "2025-03-31T09:00:00Z"
/// }
/// ```
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<axum::Json<SubscriptionStatus>, AppError> {
    let token = query.token.ok_or(AppError::TokenInvalid)?;
    let status = ledger_service::get_subscription_status(&state, &token, Utc::now()).await?;
    Ok(axum::Json(status))
}

/// Download one week's plan.
///
/// # Errors
///
/// - 400 `invalid_week`: week outside 1-4
/// - 403 `week_unavailable`: week not unlocked yet
pub async fn download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<axum::Json<WeeklyPlanResponse>, AppError> {
    let response =
        ledger_service::download_weekly_plan(&state, &request.token, request.week, Utc::now())
            .await?;
    Ok(axum::Json(response))
}

pub async fn feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<axum::Json<Value>, AppError> {
    ledger_service::submit_feedback(&state, &request.token, &request.feedback, Utc::now()).await?;
    Ok(axum::Json(json!({ "success": true })))
}

pub async fn set_pin(
    State(state): State<AppState>,
    Json(request): Json<PinRequest>,
) -> Result<axum::Json<Value>, AppError> {
    access_service::set_subscription_pin(
        state.store.as_ref(),
        &request.email,
        &request.reference,
        &request.pin,
    )
    .await?;
    Ok(axum::Json(json!({ "success": true })))
}
