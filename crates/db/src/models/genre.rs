use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertGenre {
    pub name: String,
}

impl Genre {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertGenre, id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(id)
        .bind(&data.name)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpsertGenre,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Genre>("UPDATE genres SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id)
            .bind(&data.name)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
