use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Composition {
    pub id: Uuid,
    pub title: String,
    pub duration_seconds: Option<i64>,
    pub author_band_id: Option<Uuid>,
}

/// A composition as it appears on a release, in tracklist order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Track {
    pub position: i64,
    pub composition_id: Uuid,
    pub title: String,
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertComposition {
    pub title: String,
    pub duration_seconds: Option<i64>,
    pub author_band_id: Option<Uuid>,
}

impl Composition {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Composition>(
            "SELECT id, title, duration_seconds, author_band_id FROM compositions ORDER BY title ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Composition>(
            "SELECT id, title, duration_seconds, author_band_id FROM compositions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_tracks_by_release_id(
        pool: &SqlitePool,
        release_id: Uuid,
    ) -> Result<Vec<Track>, sqlx::Error> {
        sqlx::query_as::<_, Track>(
            r#"SELECT rt.position, c.id AS composition_id, c.title, c.duration_seconds
               FROM release_tracks rt
               JOIN compositions c ON c.id = rt.composition_id
               WHERE rt.release_id = $1
               ORDER BY rt.position ASC"#,
        )
        .bind(release_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &UpsertComposition,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Composition>(
            r#"INSERT INTO compositions (id, title, duration_seconds, author_band_id)
               VALUES ($1, $2, $3, $4)
               RETURNING id, title, duration_seconds, author_band_id"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(data.duration_seconds)
        .bind(data.author_band_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpsertComposition,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Composition>(
            r#"UPDATE compositions SET title = $2, duration_seconds = $3, author_band_id = $4
               WHERE id = $1
               RETURNING id, title, duration_seconds, author_band_id"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(data.duration_seconds)
        .bind(data.author_band_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM compositions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
