//! Subscription portal models.
//!
//! This module defines:
//! - `SubscriptionToken`: bearer token granting passwordless dashboard access
//! - `DownloadRecord`: one (email, reference, week) download in the ledger
//! - `Feedback`: append-only free-text feedback
//! - Request/response types for the subscription API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a subscription access token from the database.
///
/// # Database Table
///
/// Maps to the `subscription_tokens` table. A token is valid while
/// `expires_at > now`; several tokens may exist per (email, reference).
///
/// Deliberately not `Serialize`: the token value only leaves the server
/// in the response that issued it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionToken {
    pub id: i64,
    pub email: String,
    pub token: String,

    /// Order reference by value (not a foreign key).
    pub reference: String,

    /// SHA-256 hex digest of the legacy PIN. Written, never read.
    pub pin: Option<String>,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a token.
#[derive(Debug, Clone)]
pub struct NewSubscriptionToken {
    pub email: String,
    pub token: String,
    pub reference: String,
    pub expires_at: DateTime<Utc>,
}

/// One (email, reference, week) entry of the download ledger.
///
/// The `subscription_downloads` table also keeps an id and a timestamp; the
/// ledger only ever asks which weeks were taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub email: String,
    pub reference: String,
    pub week: i32,
}

/// Represents a stored feedback row. Append-only.
///
/// The submitter's email is written alongside but not returned.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feedback {
    pub id: i64,
    pub reference: Option<String>,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
}

/// Identity resolved from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionAccess {
    pub email: String,
    pub reference: String,

    /// Creation time of the successful subscription order.
    pub subscription_date: DateTime<Utc>,
}

/// One week of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekStatus {
    pub week: u8,
    pub available: bool,
    pub downloaded: bool,
    pub access_date: DateTime<Utc>,
}

/// Dashboard payload for `GET /api/subscription/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub success: bool,
    pub email: String,
    pub reference: String,
    pub weeks: Vec<WeekStatus>,
    pub images: Vec<String>,
    pub all_downloaded: bool,
    pub subscription_status: &'static str,

    /// Display only; downloads are not blocked after this date.
    pub subscription_end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessSubscriptionQuery {
    pub email: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub token: String,
    pub week: i64,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub token: String,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub email: String,
    pub reference: String,
    pub pin: String,
}

/// Response carrying a freshly issued or recovered token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlanResponse {
    pub success: bool,
    pub week: u8,
    pub pdf_url: String,
}
