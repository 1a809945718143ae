//! PostgreSQL implementation of [`Store`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{DbPool, OrderFilter, Store};
use crate::error::AppError;
use crate::models::order::{NewOrder, Order, OrderRow, OrderStats, OrderStatus};
use crate::models::subscription::{Feedback, NewSubscriptionToken, SubscriptionToken};

const ORDER_COLUMNS: &str = "id, reference, email, first_name, last_name, phone, state, \
     apartment_type, order_type, delivery_address, landmark, amount, status, created_at, updated_at";

/// Store backed by a sqlx PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_all(rows: Vec<OrderRow>) -> Result<Vec<Order>, AppError> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order, AppError> {
        let columns = order.details.to_columns();
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (
                id, reference, email, first_name, last_name, phone, state,
                apartment_type, order_type, delivery_address, landmark, amount, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending')
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&order.reference)
        .bind(&order.email)
        .bind(&order.first_name)
        .bind(&order.last_name)
        .bind(&order.phone)
        .bind(&order.state)
        .bind(&columns.apartment_type)
        .bind(columns.order_type)
        .bind(&columns.delivery_address)
        .bind(&columns.landmark)
        .bind(order.amount)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn find_order_by_reference(&self, reference: &str) -> Result<Option<Order>, AppError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.status.map(OrderStatus::as_str))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        decode_all(rows)
    }

    async fn latest_subscription_order(&self, email: &str) -> Result<Option<Order>, AppError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE email = $1 AND order_type = 'subscription' AND status = 'success'
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn set_status_if_pending(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1,
                updated_at = NOW()
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn order_stats(&self) -> Result<OrderStats, AppError> {
        let stats = sqlx::query_as::<_, OrderStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'success') AS success,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COALESCE(SUM(amount) FILTER (WHERE status = 'success'), 0)::BIGINT AS total_revenue
            FROM orders
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn insert_token(
        &self,
        token: &NewSubscriptionToken,
    ) -> Result<SubscriptionToken, AppError> {
        let row = sqlx::query_as::<_, SubscriptionToken>(
            r#"
            INSERT INTO subscription_tokens (email, token, reference, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, token, reference, pin, expires_at, created_at
            "#,
        )
        .bind(&token.email)
        .bind(&token.token)
        .bind(&token.reference)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_unexpired_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionToken>, AppError> {
        let row = sqlx::query_as::<_, SubscriptionToken>(
            r#"
            SELECT id, email, token, reference, pin, expires_at, created_at
            FROM subscription_tokens
            WHERE token = $1 AND expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn latest_token(
        &self,
        email: &str,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionToken>, AppError> {
        let row = sqlx::query_as::<_, SubscriptionToken>(
            r#"
            SELECT id, email, token, reference, pin, expires_at, created_at
            FROM subscription_tokens
            WHERE email = $1 AND reference = $2 AND expires_at > $3
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(reference)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_token_pin(
        &self,
        email: &str,
        reference: &str,
        pin_digest: &str,
    ) -> Result<u64, AppError> {
        let touched = sqlx::query(
            "UPDATE subscription_tokens SET pin = $1 WHERE email = $2 AND reference = $3",
        )
        .bind(pin_digest)
        .bind(email)
        .bind(reference)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(touched)
    }

    async fn record_download(
        &self,
        email: &str,
        reference: &str,
        week: i32,
    ) -> Result<bool, AppError> {
        // The unique constraint on (email, reference, week) makes this safe under races
        let inserted = sqlx::query(
            r#"
            INSERT INTO subscription_downloads (email, reference, week)
            VALUES ($1, $2, $3)
            ON CONFLICT (email, reference, week) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(reference)
        .bind(week)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    async fn downloaded_weeks(&self, email: &str, reference: &str) -> Result<Vec<i32>, AppError> {
        let weeks = sqlx::query_scalar::<_, i32>(
            "SELECT week FROM subscription_downloads WHERE email = $1 AND reference = $2 ORDER BY week",
        )
        .bind(email)
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(weeks)
    }

    async fn insert_feedback(
        &self,
        email: &str,
        reference: Option<&str>,
        feedback: &str,
    ) -> Result<Feedback, AppError> {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (email, reference, feedback)
            VALUES ($1, $2, $3)
            RETURNING id, reference, feedback, submitted_at
            "#,
        )
        .bind(email)
        .bind(reference)
        .bind(feedback)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
