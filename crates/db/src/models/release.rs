use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Release {
    pub id: Uuid,
    pub title: String,
    pub release_year: Option<i64>,
    pub cover_image_url: Option<String>,
    pub band_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertRelease {
    pub title: String,
    pub release_year: Option<i64>,
    pub cover_image_url: Option<String>,
    pub band_id: Option<Uuid>,
    /// Replaces the tracklist when present; order is track order.
    pub composition_ids: Option<Vec<Uuid>>,
}

impl Release {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Release>(
            r#"SELECT id, title, release_year, cover_image_url, band_id
               FROM releases
               ORDER BY release_year DESC, title ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Release>(
            "SELECT id, title, release_year, cover_image_url, band_id FROM releases WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_band_id(pool: &SqlitePool, band_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Release>(
            r#"SELECT id, title, release_year, cover_image_url, band_id
               FROM releases
               WHERE band_id = $1
               ORDER BY release_year ASC, title ASC"#,
        )
        .bind(band_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertRelease, id: Uuid) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let release = sqlx::query_as::<_, Release>(
            r#"INSERT INTO releases (id, title, release_year, cover_image_url, band_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, title, release_year, cover_image_url, band_id"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(data.release_year)
        .bind(&data.cover_image_url)
        .bind(data.band_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(composition_ids) = &data.composition_ids {
            insert_tracks(&mut tx, id, composition_ids).await?;
        }
        tx.commit().await?;
        Ok(release)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpsertRelease,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let release = sqlx::query_as::<_, Release>(
            r#"UPDATE releases
               SET title = $2, release_year = $3, cover_image_url = $4, band_id = $5
               WHERE id = $1
               RETURNING id, title, release_year, cover_image_url, band_id"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(data.release_year)
        .bind(&data.cover_image_url)
        .bind(data.band_id)
        .fetch_optional(&mut *tx)
        .await?;

        if release.is_none() {
            return Ok(None);
        }

        if let Some(composition_ids) = &data.composition_ids {
            sqlx::query("DELETE FROM release_tracks WHERE release_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_tracks(&mut tx, id, composition_ids).await?;
        }
        tx.commit().await?;
        Ok(release)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM releases WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

async fn insert_tracks(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    release_id: Uuid,
    composition_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    for (index, composition_id) in composition_ids.iter().enumerate() {
        sqlx::query(
            r#"INSERT OR IGNORE INTO release_tracks (release_id, composition_id, position)
               VALUES ($1, $2, $3)"#,
        )
        .bind(release_id)
        .bind(composition_id)
        .bind(index as i64 + 1)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
