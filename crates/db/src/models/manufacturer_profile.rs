use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Company details attached to a user with the manufacturer role.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ManufacturerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub company_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile joined with the owning account, for admin listings.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ManufacturerWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub company_name: String,
    pub company_address: Option<String>,
    pub record_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertManufacturerProfile {
    pub company_name: String,
    pub company_address: Option<String>,
}

impl ManufacturerProfile {
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ManufacturerProfile>(
            r#"SELECT id, user_id, company_name, company_address, created_at, updated_at
               FROM manufacturer_profiles
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ManufacturerProfile>(
            r#"SELECT id, user_id, company_name, company_address, created_at, updated_at
               FROM manufacturer_profiles
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Creates the profile for `user_id`, or replaces its company details.
    pub async fn upsert<'e, E>(
        executor: E,
        user_id: Uuid,
        data: &UpsertManufacturerProfile,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, ManufacturerProfile>(
            r#"INSERT INTO manufacturer_profiles (id, user_id, company_name, company_address)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT(user_id) DO UPDATE SET
                   company_name = excluded.company_name,
                   company_address = excluded.company_address,
                   updated_at = datetime('now', 'subsec')
               RETURNING id, user_id, company_name, company_address, created_at, updated_at"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&data.company_name)
        .bind(&data.company_address)
        .fetch_one(executor)
        .await
    }

    pub async fn find_all_with_users(
        pool: &SqlitePool,
    ) -> Result<Vec<ManufacturerWithUser>, sqlx::Error> {
        sqlx::query_as::<_, ManufacturerWithUser>(
            r#"SELECT
                mp.id,
                mp.user_id,
                u.username,
                u.email,
                mp.company_name,
                mp.company_address,
                (SELECT COUNT(*) FROM records r WHERE r.manufacturer_profile_id = mp.id) AS record_count
               FROM manufacturer_profiles mp
               JOIN users u ON u.id = mp.user_id
               ORDER BY mp.company_name ASC"#,
        )
        .fetch_all(pool)
        .await
    }
}
