use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Manufacturer,
    Admin,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub shipping_address: Option<String>,
}

/// Number of users holding a role, for the admin dashboard.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct RoleCount {
    pub role: UserRole,
    pub count: i64,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, shipping_address, created_at, updated_at";

impl User {
    pub async fn create<'e, E>(executor: E, data: &CreateUser, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (id, username, email, password_hash, role, shipping_address)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(data.role)
        .bind(&data.shipping_address)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, username ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn exists_with_role(pool: &SqlitePool, role: UserRole) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn count_by_role(pool: &SqlitePool) -> Result<Vec<RoleCount>, sqlx::Error> {
        sqlx::query_as::<_, RoleCount>(
            "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn update_role(
        pool: &SqlitePool,
        id: Uuid,
        role: UserRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users SET role = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_shipping_address<'e, E>(
        executor: E,
        id: Uuid,
        shipping_address: Option<&str>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE users SET shipping_address = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(shipping_address)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
