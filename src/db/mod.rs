//! Datastore access.
//!
//! This module provides:
//! - The [`Store`] trait: every row operation the order/subscription flow needs
//! - [`PgStore`]: the PostgreSQL implementation (production)
//! - [`MemoryStore`]: an in-process implementation for development and tests
//! - Pool creation and migrations for PostgreSQL
//!
//! The datastore is the only shared mutable resource in the service. Each
//! operation is a single statement; nothing spans multiple rows in a transaction,
//! so callers treat every step as independently retriable.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{NewOrder, Order, OrderStats, OrderStatus};
use crate::models::subscription::{Feedback, NewSubscriptionToken, SubscriptionToken};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Filter for the admin order list.
#[derive(Debug, Clone, Copy)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Row operations over `orders`, `subscription_tokens`,
/// `subscription_downloads` and `feedback`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), AppError>;

    /// Insert a `pending` order. Fails if the reference already exists.
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, AppError>;

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, AppError>;

    async fn find_order_by_reference(&self, reference: &str) -> Result<Option<Order>, AppError>;

    /// Newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, AppError>;

    /// Newest successful subscription order for an email.
    async fn latest_subscription_order(&self, email: &str) -> Result<Option<Order>, AppError>;

    /// Write `status` only while the row is still `pending`.
    ///
    /// Returns `true` when a row changed. `false` means the row is missing or
    /// already terminal; the caller re-reads to tell which.
    async fn set_status_if_pending(&self, id: Uuid, status: OrderStatus)
    -> Result<bool, AppError>;

    async fn order_stats(&self) -> Result<OrderStats, AppError>;

    async fn insert_token(&self, token: &NewSubscriptionToken)
    -> Result<SubscriptionToken, AppError>;

    /// Token row with `expires_at > now`.
    async fn find_unexpired_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionToken>, AppError>;

    /// Most recently created unexpired token for (email, reference).
    async fn latest_token(
        &self,
        email: &str,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionToken>, AppError>;

    /// Store a PIN digest on every token of (email, reference). Returns rows touched.
    async fn set_token_pin(
        &self,
        email: &str,
        reference: &str,
        pin_digest: &str,
    ) -> Result<u64, AppError>;

    /// Insert-or-ignore on (email, reference, week). Returns `true` if a row was added.
    async fn record_download(
        &self,
        email: &str,
        reference: &str,
        week: i32,
    ) -> Result<bool, AppError>;

    async fn downloaded_weeks(&self, email: &str, reference: &str) -> Result<Vec<i32>, AppError>;

    async fn insert_feedback(
        &self,
        email: &str,
        reference: Option<&str>,
        feedback: &str,
    ) -> Result<Feedback, AppError>;
}

/// Create a new PostgreSQL connection pool.
///
/// A connection pool maintains multiple database connections that can be reused across HTTP requests which is much more efficient than opening a new connection for each request.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}
