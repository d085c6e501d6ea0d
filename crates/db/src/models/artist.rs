use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Artist {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertArtist {
    pub name: String,
    pub bio: Option<String>,
}

impl Artist {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Artist>("SELECT id, name, bio FROM artists ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Artist>("SELECT id, name, bio FROM artists WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_band_id(pool: &SqlitePool, band_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Artist>(
            r#"SELECT a.id, a.name, a.bio
               FROM artists a
               JOIN band_members bm ON bm.artist_id = a.id
               WHERE bm.band_id = $1
               ORDER BY a.name ASC"#,
        )
        .bind(band_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertArtist, id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Artist>(
            "INSERT INTO artists (id, name, bio) VALUES ($1, $2, $3) RETURNING id, name, bio",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.bio)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpsertArtist,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Artist>(
            "UPDATE artists SET name = $2, bio = $3 WHERE id = $1 RETURNING id, name, bio",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.bio)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM artists WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
