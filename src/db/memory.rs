//! In-process implementation of [`Store`].
//!
//! Mirrors the PostgreSQL constraints that the flow relies on: unique order
//! references, unique token values and insert-or-ignore downloads on
//! (email, reference, week). Data is lost when the process exits.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{OrderFilter, Store};
use crate::error::AppError;
use crate::models::order::{NewOrder, Order, OrderStats, OrderStatus, OrderType};
use crate::models::subscription::{
    DownloadRecord, Feedback, NewSubscriptionToken, SubscriptionToken,
};

#[derive(Debug, Default)]
struct Tables {
    orders: Vec<Order>,
    tokens: Vec<SubscriptionToken>,
    downloads: Vec<DownloadRecord>,
    /// Keyed by submitter email.
    feedback: Vec<(String, Feedback)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Persistence("memory store lock poisoned".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn set_order_created_at(&self, reference: &str, created_at: DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.reference == reference)
            .expect("order exists");
        order.created_at = created_at;
    }

    #[cfg(test)]
    pub(crate) fn download_count(&self) -> usize {
        self.tables.lock().unwrap().downloads.len()
    }

    #[cfg(test)]
    pub(crate) fn token_count(&self) -> usize {
        self.tables.lock().unwrap().tokens.len()
    }

    #[cfg(test)]
    pub(crate) fn feedback_rows(&self) -> Vec<Feedback> {
        self.tables
            .lock()
            .unwrap()
            .feedback
            .iter()
            .map(|(_, row)| row.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn token_pins(&self) -> Vec<Option<String>> {
        self.tables
            .lock()
            .unwrap()
            .tokens
            .iter()
            .map(|t| t.pin.clone())
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.tables().map(|_| ())
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order, AppError> {
        let mut tables = self.tables()?;
        if tables.orders.iter().any(|o| o.reference == order.reference) {
            return Err(AppError::Persistence(format!(
                "duplicate key value violates unique constraint on reference {}",
                order.reference
            )));
        }

        let now = Utc::now();
        let row = Order {
            id: Uuid::new_v4(),
            reference: order.reference.clone(),
            email: order.email.clone(),
            first_name: order.first_name.clone(),
            last_name: order.last_name.clone(),
            phone: order.phone.clone(),
            state: order.state.clone(),
            details: order.details.clone(),
            amount: order.amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.orders.push(row.clone());
        Ok(row)
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.tables()?.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_order_by_reference(&self, reference: &str) -> Result<Option<Order>, AppError> {
        Ok(self
            .tables()?
            .orders
            .iter()
            .find(|o| o.reference == reference)
            .cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, AppError> {
        let tables = self.tables()?;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(orders
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn latest_subscription_order(&self, email: &str) -> Result<Option<Order>, AppError> {
        Ok(self
            .tables()?
            .orders
            .iter()
            .filter(|o| {
                o.email == email
                    && o.order_type() == OrderType::Subscription
                    && o.status == OrderStatus::Success
            })
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn set_status_if_pending(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables()?;
        match tables
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == OrderStatus::Pending)
        {
            Some(order) => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn order_stats(&self) -> Result<OrderStats, AppError> {
        let tables = self.tables()?;
        let count = |status: OrderStatus| {
            tables.orders.iter().filter(|o| o.status == status).count() as i64
        };

        Ok(OrderStats {
            total: tables.orders.len() as i64,
            pending: count(OrderStatus::Pending),
            success: count(OrderStatus::Success),
            failed: count(OrderStatus::Failed),
            total_revenue: tables
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Success)
                .map(|o| o.amount)
                .sum(),
        })
    }

    async fn insert_token(
        &self,
        token: &NewSubscriptionToken,
    ) -> Result<SubscriptionToken, AppError> {
        let mut tables = self.tables()?;
        if tables.tokens.iter().any(|t| t.token == token.token) {
            return Err(AppError::Persistence(
                "duplicate key value violates unique constraint on token".to_string(),
            ));
        }

        let row = SubscriptionToken {
            id: tables.next_id(),
            email: token.email.clone(),
            token: token.token.clone(),
            reference: token.reference.clone(),
            pin: None,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };
        tables.tokens.push(row.clone());
        Ok(row)
    }

    async fn find_unexpired_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionToken>, AppError> {
        Ok(self
            .tables()?
            .tokens
            .iter()
            .find(|t| t.token == token && t.expires_at > now)
            .cloned())
    }

    async fn latest_token(
        &self,
        email: &str,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionToken>, AppError> {
        Ok(self
            .tables()?
            .tokens
            .iter()
            .filter(|t| t.email == email && t.reference == reference && t.expires_at > now)
            .max_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    async fn set_token_pin(
        &self,
        email: &str,
        reference: &str,
        pin_digest: &str,
    ) -> Result<u64, AppError> {
        let mut tables = self.tables()?;
        let mut touched = 0;
        for token in tables
            .tokens
            .iter_mut()
            .filter(|t| t.email == email && t.reference == reference)
        {
            token.pin = Some(pin_digest.to_string());
            touched += 1;
        }
        Ok(touched)
    }

    async fn record_download(
        &self,
        email: &str,
        reference: &str,
        week: i32,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables()?;
        if tables
            .downloads
            .iter()
            .any(|d| d.email == email && d.reference == reference && d.week == week)
        {
            return Ok(false);
        }

        tables.downloads.push(DownloadRecord {
            email: email.to_string(),
            reference: reference.to_string(),
            week,
        });
        Ok(true)
    }

    async fn downloaded_weeks(&self, email: &str, reference: &str) -> Result<Vec<i32>, AppError> {
        let mut weeks: Vec<i32> = self
            .tables()?
            .downloads
            .iter()
            .filter(|d| d.email == email && d.reference == reference)
            .map(|d| d.week)
            .collect();
        weeks.sort_unstable();
        Ok(weeks)
    }

    async fn insert_feedback(
        &self,
        email: &str,
        reference: Option<&str>,
        feedback: &str,
    ) -> Result<Feedback, AppError> {
        let mut tables = self.tables()?;
        let row = Feedback {
            id: tables.next_id(),
            reference: reference.map(str::to_string),
            feedback: feedback.to_string(),
            submitted_at: Utc::now(),
        };
        tables.feedback.push((email.to_string(), row.clone()));
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{MealPlan, OrderDetails};

    fn new_order(reference: &str) -> NewOrder {
        NewOrder {
            reference: reference.to_string(),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            phone: "0803".into(),
            state: "Lagos".into(),
            details: OrderDetails::Subscription {
                meal_plan: MealPlan::General,
            },
            amount: 25_000,
        }
    }

    #[tokio::test]
    async fn duplicate_reference_is_rejected() {
        let store = MemoryStore::new();
        store.insert_order(&new_order("EFFIDELI_1_1000")).await.unwrap();

        let err = store
            .insert_order(&new_order("EFFIDELI_1_1000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[tokio::test]
    async fn status_write_only_applies_to_pending_rows() {
        let store = MemoryStore::new();
        let order = store.insert_order(&new_order("EFFIDELI_1_1000")).await.unwrap();

        assert!(store.set_status_if_pending(order.id, OrderStatus::Success).await.unwrap());
        assert!(!store.set_status_if_pending(order.id, OrderStatus::Failed).await.unwrap());
        assert!(!store.set_status_if_pending(Uuid::new_v4(), OrderStatus::Failed).await.unwrap());

        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Success);
    }

    #[tokio::test]
    async fn downloads_are_insert_or_ignore() {
        let store = MemoryStore::new();
        assert!(store.record_download("a@b.c", "R", 2).await.unwrap());
        assert!(!store.record_download("a@b.c", "R", 2).await.unwrap());
        assert!(store.record_download("a@b.c", "R", 1).await.unwrap());

        assert_eq!(store.downloaded_weeks("a@b.c", "R").await.unwrap(), vec![1, 2]);
        assert_eq!(store.download_count(), 2);
    }

    #[tokio::test]
    async fn list_filters_and_pages_newest_first() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .insert_order(&new_order(&format!("EFFIDELI_{i}_1000")))
                .await
                .unwrap();
        }
        store.set_order_created_at("EFFIDELI_0_1000", Utc::now() + chrono::Duration::hours(1));

        let page = store
            .list_orders(OrderFilter {
                status: Some(OrderStatus::Pending),
                limit: 2,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].reference, "EFFIDELI_0_1000");

        let none = store
            .list_orders(OrderFilter {
                status: Some(OrderStatus::Success),
                ..OrderFilter::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
