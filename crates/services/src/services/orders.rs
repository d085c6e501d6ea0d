//! Order history and the order status lifecycle.

use db::models::{
    order::{Order, OrderItem, OrderStatus, OrderWithItems},
    record::Record,
    user::User,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("order not found")]
    NotFound,
    #[error("cannot change order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order was changed by someone else, reload and retry")]
    Conflict,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

pub struct OrderService;

impl OrderService {
    pub async fn list_for_user(pool: &SqlitePool, user: &User) -> Result<Vec<Order>, OrderError> {
        Ok(Order::find_by_user_id(pool, user.id).await?)
    }

    /// Owners and admins see the order; anyone else gets NotFound.
    pub async fn get(pool: &SqlitePool, user: &User, order_id: Uuid) -> Result<OrderWithItems, OrderError> {
        let order = Order::find_by_id(pool, order_id)
            .await?
            .filter(|order| order.user_id == user.id || user.is_admin())
            .ok_or(OrderError::NotFound)?;
        let items = OrderItem::find_details_by_order_id(pool, order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Customer cancellation: own orders only, and only before shipping.
    pub async fn cancel(pool: &SqlitePool, user: &User, order_id: Uuid) -> Result<Order, OrderError> {
        let order = Order::find_by_id(pool, order_id)
            .await?
            .filter(|order| order.user_id == user.id)
            .ok_or(OrderError::NotFound)?;
        if order.status != OrderStatus::Processing {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }
        Self::transition(pool, &order, OrderStatus::Cancelled).await
    }

    pub async fn list_all(pool: &SqlitePool, status: Option<OrderStatus>) -> Result<Vec<Order>, OrderError> {
        Ok(Order::find_all(pool, status).await?)
    }

    pub async fn update_status(
        pool: &SqlitePool,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = Order::find_by_id(pool, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        Self::transition(pool, &order, next).await
    }

    /// Applies a status change; cancelling puts the items back into stock.
    async fn transition(pool: &SqlitePool, order: &Order, next: OrderStatus) -> Result<Order, OrderError> {
        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }

        let mut tx = pool.begin().await?;
        let updated = Order::transition_status(&mut *tx, order.id, order.status, next)
            .await?
            .ok_or(OrderError::Conflict)?;
        if next == OrderStatus::Cancelled {
            for item in OrderItem::find_by_order_id(&mut *tx, order.id).await? {
                Record::restock(&mut *tx, item.record_id, item.quantity).await?;
            }
        }
        tx.commit().await?;

        info!(order_id = %order.id, from = %order.status, to = %next, "Order status changed");
        Ok(updated)
    }
}
