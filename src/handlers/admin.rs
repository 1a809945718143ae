//! Admin order endpoints. Every route here sits behind `admin_auth`.
//!
//! - GET /api/admin/orders?status=&limit=&offset= - Newest first
//! - GET /api/admin/orders/{id} - One order
//! - PATCH /api/admin/orders/{id}/status - Settle a pending order by hand
//! - GET /api/admin/stats - Counts and revenue

use crate::{
    db::OrderFilter,
    error::AppError,
    extractors::{Json, Path, Query},
    models::order::{Order, OrderStats, OrderStatus, StatusChange},
    services::order_service,
    state::AppState,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest page the list endpoint returns.
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListOrdersQuery {
    fn filter(&self) -> Result<OrderFilter, AppError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()?;
        let defaults = OrderFilter::default();

        Ok(OrderFilter {
            status,
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0).max(0),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub change: StatusChange,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: OrderStats,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<axum::Json<OrdersResponse>, AppError> {
    let orders = state.store.list_orders(query.filter()?).await?;
    Ok(axum::Json(OrdersResponse {
        success: true,
        orders,
    }))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::Json<OrderResponse>, AppError> {
    let order = state
        .store
        .find_order(id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    Ok(axum::Json(OrderResponse {
        success: true,
        order,
    }))
}

/// Move a pending order to `success` or `failed`.
///
/// # Request Body
///
/// ```json
/// { "status": "success" }
/// ```
///
/// # Errors
///
/// - 404 unknown id
/// - 409 order already settled differently, or target is `pending`
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<axum::Json<UpdateStatusResponse>, AppError> {
    let status: OrderStatus = request.status.parse()?;
    let change =
        order_service::update_order_status(state.store.as_ref(), state.views.as_ref(), id, status)
            .await?;
    tracing::info!(order_id = %id, %status, ?change, "admin status update");

    Ok(axum::Json(UpdateStatusResponse {
        success: true,
        change,
    }))
}

pub async fn stats(State(state): State<AppState>) -> Result<axum::Json<StatsResponse>, AppError> {
    let stats = order_service::get_order_stats(state.store.as_ref()).await?;
    Ok(axum::Json(StatsResponse {
        success: true,
        stats,
    }))
}
