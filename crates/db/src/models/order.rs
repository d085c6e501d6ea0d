use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    BankTransfer,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// First block of the id, used in flash messages.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// One order line. `unit_price_cents` is the price at the time of purchase.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub record_id: Uuid,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Order line with the record title, for display.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct OrderItemDetail {
    pub id: Uuid,
    pub record_id: Uuid,
    pub record_title: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct OrderWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

impl std::ops::Deref for OrderWithItems {
    type Target = Order;
    fn deref(&self) -> &Self::Target {
        &self.order
    }
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub user_id: Uuid,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

const ORDER_COLUMNS: &str =
    "id, user_id, status, payment_method, shipping_address, total_cents, created_at, updated_at";

impl Order {
    pub async fn create<'e, E>(executor: E, data: &CreateOrder, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Order>(&format!(
            r#"INSERT INTO orders (id, user_id, status, payment_method, shipping_address, total_cents)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {ORDER_COLUMNS}"#
        ))
        .bind(id)
        .bind(data.user_id)
        .bind(OrderStatus::Processing)
        .bind(data.payment_method)
        .bind(&data.shipping_address)
        .bind(data.total_cents)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_user_id(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_all(
        pool: &SqlitePool,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM orders
               WHERE $1 IS NULL OR status = $1
               ORDER BY created_at DESC"#
        ))
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Moves the order from `from` to `to`. Returns None, changing nothing,
    /// when the order is missing or no longer in `from`.
    pub async fn transition_status<'e, E>(
        executor: E,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Order>(&format!(
            r#"UPDATE orders SET status = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1 AND status = $2
               RETURNING {ORDER_COLUMNS}"#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await
    }

    pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<StatusCount>, sqlx::Error> {
        sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }

    /// Sum of totals over orders that were not cancelled.
    pub async fn revenue_cents(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COALESCE(SUM(total_cents), 0) FROM orders WHERE status != 'cancelled'")
            .fetch_one(pool)
            .await
    }
}

impl OrderItem {
    pub async fn create<'e, E>(
        executor: E,
        order_id: Uuid,
        record_id: Uuid,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, OrderItem>(
            r#"INSERT INTO order_items (id, order_id, record_id, quantity, unit_price_cents)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, order_id, record_id, quantity, unit_price_cents"#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(record_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_order_id<'e, E>(
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, OrderItem>(
            r#"SELECT id, order_id, record_id, quantity, unit_price_cents
               FROM order_items
               WHERE order_id = $1"#,
        )
        .bind(order_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_details_by_order_id<'e, E>(
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemDetail>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, OrderItemDetail>(
            r#"SELECT
                oi.id,
                oi.record_id,
                r.title                            AS record_title,
                oi.quantity,
                oi.unit_price_cents,
                oi.quantity * oi.unit_price_cents  AS line_total_cents
               FROM order_items oi
               JOIN records r ON r.id = oi.record_id
               WHERE oi.order_id = $1
               ORDER BY r.title ASC"#,
        )
        .bind(order_id)
        .fetch_all(executor)
        .await
    }
}
