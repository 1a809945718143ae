//! Subscription dashboard, download ledger and feedback.
//!
//! Every operation re-verifies the token first; nothing here trusts a
//! previously resolved identity.

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::subscription::{SubscriptionStatus, WeekStatus, WeeklyPlanResponse};
use crate::services::access_service::verify_subscription_access;
use crate::services::schedule;
use crate::services::views::SUBSCRIPTION_DASHBOARD;
use crate::state::AppState;

/// Longest feedback accepted, in characters.
pub const MAX_FEEDBACK_CHARS: usize = 5_000;

/// Dashboard data: which weeks are unlocked and which were downloaded.
///
/// `all_downloaded` only looks at available weeks; locked weeks never hold it back.
pub async fn get_subscription_status(
    state: &AppState,
    token: &str,
    now: DateTime<Utc>,
) -> Result<SubscriptionStatus, AppError> {
    let access = verify_subscription_access(state.store.as_ref(), token, now).await?;

    let downloaded = match state
        .store
        .downloaded_weeks(&access.email, &access.reference)
        .await
    {
        Ok(weeks) => weeks,
        Err(e) => {
            tracing::warn!(error = %e, "download history unavailable, showing none");
            Vec::new()
        }
    };

    let weeks: Vec<WeekStatus> = schedule::week_schedule(access.subscription_date, now)
        .into_iter()
        .map(|unlock| WeekStatus {
            week: unlock.week,
            available: unlock.available,
            downloaded: downloaded.contains(&i32::from(unlock.week)),
            access_date: unlock.access_date,
        })
        .collect();
    let all_downloaded = weeks.iter().filter(|w| w.available).all(|w| w.downloaded);

    Ok(SubscriptionStatus {
        success: true,
        email: access.email,
        reference: access.reference,
        weeks,
        images: state.catalog.week_preview_images(),
        all_downloaded,
        subscription_status: "active",
        subscription_end_date: schedule::subscription_end_date(access.subscription_date),
    })
}

/// Hand out the PDF for an unlocked week and record the download.
///
/// # Errors
///
/// - `TokenInvalid`/`SubscriptionNotFound`: token rejected
/// - `InvalidWeek`: week outside 1..=4
/// - `WeekUnavailable`: week has not unlocked yet (nothing is recorded)
///
/// A failed ledger write is logged; the subscriber still gets the document.
#[tracing::instrument(skip(state, token))]
pub async fn download_weekly_plan(
    state: &AppState,
    token: &str,
    week: i64,
    now: DateTime<Utc>,
) -> Result<WeeklyPlanResponse, AppError> {
    let access = verify_subscription_access(state.store.as_ref(), token, now).await?;
    let week = schedule::check_week(week)?;

    if !schedule::is_available(access.subscription_date, now, week) {
        return Err(AppError::WeekUnavailable);
    }

    match state
        .store
        .record_download(&access.email, &access.reference, i32::from(week))
        .await
    {
        Ok(true) => {
            tracing::info!(reference = %access.reference, "download recorded");
            state.views.revalidate(SUBSCRIPTION_DASHBOARD);
        }
        Ok(false) => {}
        Err(e) => tracing::error!(error = %e, "failed to record download"),
    }

    Ok(WeeklyPlanResponse {
        success: true,
        week,
        pdf_url: state.catalog.weekly_plan_pdf(week),
    })
}

/// Append free-text feedback for the token's subscription.
///
/// # Errors
///
/// - `TokenInvalid`/`SubscriptionNotFound`: token rejected
/// - `Validation`: empty or oversized feedback
pub async fn submit_feedback(
    state: &AppState,
    token: &str,
    feedback: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let access = verify_subscription_access(state.store.as_ref(), token, now).await?;

    let feedback = feedback.trim();
    if feedback.is_empty() {
        return Err(AppError::Validation("Feedback is required".to_string()));
    }
    if feedback.chars().count() > MAX_FEEDBACK_CHARS {
        return Err(AppError::Validation(format!(
            "Feedback must be at most {MAX_FEEDBACK_CHARS} characters"
        )));
    }

    let row = state
        .store
        .insert_feedback(&access.email, Some(&access.reference), feedback)
        .await?;
    tracing::info!(
        feedback_id = row.id,
        reference = row.reference.as_deref().unwrap_or_default(),
        chars = row.feedback.chars().count(),
        submitted_at = %row.submitted_at,
        "feedback recorded"
    );

    Ok(())
}
