use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Band {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub genre_id: Option<Uuid>,
}

/// Band row with its genre name resolved.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct BandWithGenre {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub genre_id: Option<Uuid>,
    pub genre_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertBand {
    pub name: String,
    pub bio: Option<String>,
    pub genre_id: Option<Uuid>,
    /// Replaces the member list when present.
    pub member_ids: Option<Vec<Uuid>>,
}

impl Band {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<BandWithGenre>, sqlx::Error> {
        sqlx::query_as::<_, BandWithGenre>(
            r#"SELECT b.id, b.name, b.bio, b.genre_id, g.name AS genre_name
               FROM bands b
               LEFT JOIN genres g ON g.id = b.genre_id
               ORDER BY b.name ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<BandWithGenre>, sqlx::Error> {
        sqlx::query_as::<_, BandWithGenre>(
            r#"SELECT b.id, b.name, b.bio, b.genre_id, g.name AS genre_name
               FROM bands b
               LEFT JOIN genres g ON g.id = b.genre_id
               WHERE b.id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Inserts the band and, when given, its members in one transaction.
    pub async fn create(pool: &SqlitePool, data: &UpsertBand, id: Uuid) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let band = sqlx::query_as::<_, Band>(
            r#"INSERT INTO bands (id, name, bio, genre_id)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, bio, genre_id"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.bio)
        .bind(data.genre_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(member_ids) = &data.member_ids {
            for artist_id in member_ids {
                sqlx::query("INSERT OR IGNORE INTO band_members (band_id, artist_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(artist_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(band)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpsertBand,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let band = sqlx::query_as::<_, Band>(
            r#"UPDATE bands SET name = $2, bio = $3, genre_id = $4
               WHERE id = $1
               RETURNING id, name, bio, genre_id"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.bio)
        .bind(data.genre_id)
        .fetch_optional(&mut *tx)
        .await?;

        if band.is_none() {
            return Ok(None);
        }

        if let Some(member_ids) = &data.member_ids {
            sqlx::query("DELETE FROM band_members WHERE band_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for artist_id in member_ids {
                sqlx::query("INSERT OR IGNORE INTO band_members (band_id, artist_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(artist_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(band)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bands WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
