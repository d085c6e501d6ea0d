use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// One cart entry. Title and price are cached for display; checkout reprices
/// from the records table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct CartLine {
    pub title: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

/// Session-held cart keyed by record id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct Cart(pub BTreeMap<Uuid, CartLine>);

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, record_id: &Uuid) -> Option<&CartLine> {
        self.0.get(record_id)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&Uuid, &CartLine)> {
        self.0.iter()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.0.values().map(|line| line.quantity).sum()
    }

    pub fn insert(&mut self, record_id: Uuid, line: CartLine) {
        self.0.insert(record_id, line);
    }

    pub fn remove(&mut self, record_id: &Uuid) -> Option<CartLine> {
        self.0.remove(record_id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Server-side browser session: who is logged in and what is in their cart.
#[derive(Debug, Clone, FromRow)]
pub struct WebSession {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub cart: Json<Cart>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebSession {
    pub fn cart(&self) -> &Cart {
        &self.cart.0
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, WebSession>(
            r#"INSERT INTO web_sessions (id, expires_at)
               VALUES ($1, $2)
               RETURNING id, user_id, cart, expires_at, created_at, updated_at"#,
        )
        .bind(id)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    /// Finds a session that has not expired as of `now`.
    pub async fn find_active(
        pool: &SqlitePool,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WebSession>(
            r#"SELECT id, user_id, cart, expires_at, created_at, updated_at
               FROM web_sessions
               WHERE id = $1 AND expires_at > $2"#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    /// Pushes the expiry forward.
    pub async fn touch(
        pool: &SqlitePool,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE web_sessions SET expires_at = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn load_cart<'e, E>(executor: E, id: Uuid) -> Result<Option<Cart>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let cart: Option<Json<Cart>> =
            sqlx::query_scalar("SELECT cart FROM web_sessions WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(cart.map(|Json(cart)| cart))
    }

    /// Reads the cart through a write on the session row.
    ///
    /// Issued as the first statement of a transaction this takes SQLite's
    /// write lock up front, so concurrent checkouts run one after another
    /// and each sees the stock the previous one left.
    pub async fn claim_cart<'e, E>(executor: E, id: Uuid) -> Result<Option<Cart>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let cart: Option<Json<Cart>> = sqlx::query_scalar(
            r#"UPDATE web_sessions SET updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING cart"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(cart.map(|Json(cart)| cart))
    }

    pub async fn save_cart<'e, E>(executor: E, id: Uuid, cart: &Cart) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE web_sessions SET cart = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(Json(cart))
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Moves the session to a fresh id and binds it to `user_id`, keeping the cart.
    pub async fn rotate(
        pool: &SqlitePool,
        id: Uuid,
        new_id: Uuid,
        user_id: Option<Uuid>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WebSession>(
            r#"UPDATE web_sessions
               SET id = $2, user_id = $3, expires_at = $4, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, user_id, cart, expires_at, created_at, updated_at"#,
        )
        .bind(id)
        .bind(new_id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM web_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM web_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
