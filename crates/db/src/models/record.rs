use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Physical format of a pressing.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "record_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordType {
    #[default]
    Lp,
    Ep,
    Single,
    DoubleLp,
}

/// A purchasable pressing. Prices are integer cents.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Record {
    pub id: Uuid,
    pub title: String,
    pub release_year: Option<i64>,
    pub record_type: RecordType,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub release_id: Option<Uuid>,
    pub manufacturer_profile_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog row: a record with the names needed to display it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct RecordSummary {
    pub id: Uuid,
    pub title: String,
    pub release_year: Option<i64>,
    pub record_type: RecordType,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub cover_image_url: Option<String>,
    pub release_id: Option<Uuid>,
    pub release_title: Option<String>,
    pub band_id: Option<Uuid>,
    pub band_name: Option<String>,
    pub genre_id: Option<Uuid>,
    pub genre_name: Option<String>,
    pub manufacturer_profile_id: Option<Uuid>,
    pub manufacturer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateRecord {
    pub title: String,
    pub release_year: Option<i64>,
    pub record_type: Option<RecordType>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub release_id: Option<Uuid>,
    pub manufacturer_profile_id: Option<Uuid>,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateRecord {
    pub title: Option<String>,
    pub release_year: Option<i64>,
    pub record_type: Option<RecordType>,
    pub price_cents: Option<i64>,
    pub stock_quantity: Option<i64>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub release_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl RecordSort {
    fn order_by(self) -> &'static str {
        match self {
            RecordSort::Newest => " ORDER BY r.created_at DESC, r.title ASC",
            RecordSort::PriceAsc => " ORDER BY r.price_cents ASC, r.title ASC",
            RecordSort::PriceDesc => " ORDER BY r.price_cents DESC, r.title ASC",
            RecordSort::Title => " ORDER BY r.title COLLATE NOCASE ASC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub search: Option<String>,
    pub genre_id: Option<Uuid>,
    pub band_id: Option<Uuid>,
    pub manufacturer_profile_id: Option<Uuid>,
    pub in_stock_only: bool,
    pub sort: RecordSort,
    pub limit: i64,
    pub offset: i64,
}

const RECORD_COLUMNS: &str = "id, title, release_year, record_type, price_cents, stock_quantity, description, cover_image_url, release_id, manufacturer_profile_id, created_at, updated_at";

const SUMMARY_SELECT: &str = r#"SELECT
    r.id,
    r.title,
    r.release_year,
    r.record_type,
    r.price_cents,
    r.stock_quantity,
    r.cover_image_url,
    r.release_id,
    rel.title        AS release_title,
    b.id             AS band_id,
    b.name           AS band_name,
    g.id             AS genre_id,
    g.name           AS genre_name,
    r.manufacturer_profile_id,
    mp.company_name  AS manufacturer_name
FROM records r
LEFT JOIN releases rel ON rel.id = r.release_id
LEFT JOIN bands b ON b.id = rel.band_id
LEFT JOIN genres g ON g.id = b.genre_id
LEFT JOIN manufacturer_profiles mp ON mp.id = r.manufacturer_profile_id
WHERE 1 = 1"#;

const COUNT_SELECT: &str = r#"SELECT COUNT(*)
FROM records r
LEFT JOIN releases rel ON rel.id = r.release_id
LEFT JOIN bands b ON b.id = rel.band_id
WHERE 1 = 1"#;

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a RecordFilter) {
    if let Some(search) = filter.search.as_deref() {
        let pattern = like_pattern(search);
        builder.push(" AND (LOWER(r.title) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR LOWER(COALESCE(rel.title, '')) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR LOWER(COALESCE(b.name, '')) LIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }
    if let Some(genre_id) = filter.genre_id {
        builder.push(" AND b.genre_id = ");
        builder.push_bind(genre_id);
    }
    if let Some(band_id) = filter.band_id {
        builder.push(" AND rel.band_id = ");
        builder.push_bind(band_id);
    }
    if let Some(manufacturer_profile_id) = filter.manufacturer_profile_id {
        builder.push(" AND r.manufacturer_profile_id = ");
        builder.push_bind(manufacturer_profile_id);
    }
    if filter.in_stock_only {
        builder.push(" AND r.stock_quantity > 0");
    }
}

impl Record {
    pub async fn find_summaries(
        pool: &SqlitePool,
        filter: &RecordFilter,
    ) -> Result<Vec<RecordSummary>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
        push_filter(&mut builder, filter);
        builder.push(filter.sort.order_by());
        builder.push(" LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset);
        builder
            .build_query_as::<RecordSummary>()
            .fetch_all(pool)
            .await
    }

    pub async fn count_matching(pool: &SqlitePool, filter: &RecordFilter) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new(COUNT_SELECT);
        push_filter(&mut builder, filter);
        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    pub async fn find_summary_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<RecordSummary>, sqlx::Error> {
        sqlx::query_as::<_, RecordSummary>(&format!("{SUMMARY_SELECT} AND r.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Record>(&format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateRecord, id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Record>(&format!(
            r#"INSERT INTO records (id, title, release_year, record_type, price_cents, stock_quantity,
                                    description, cover_image_url, release_id, manufacturer_profile_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING {RECORD_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.title)
        .bind(data.release_year)
        .bind(data.record_type.unwrap_or_default())
        .bind(data.price_cents)
        .bind(data.stock_quantity)
        .bind(&data.description)
        .bind(&data.cover_image_url)
        .bind(data.release_id)
        .bind(data.manufacturer_profile_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateRecord,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Record>(&format!(
            r#"UPDATE records SET
                   title           = COALESCE($2, title),
                   release_year    = COALESCE($3, release_year),
                   record_type     = COALESCE($4, record_type),
                   price_cents     = COALESCE($5, price_cents),
                   stock_quantity  = COALESCE($6, stock_quantity),
                   description     = COALESCE($7, description),
                   cover_image_url = COALESCE($8, cover_image_url),
                   release_id      = COALESCE($9, release_id),
                   updated_at      = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {RECORD_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.title)
        .bind(data.release_year)
        .bind(data.record_type)
        .bind(data.price_cents)
        .bind(data.stock_quantity)
        .bind(&data.description)
        .bind(&data.cover_image_url)
        .bind(data.release_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM records WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn has_order_items(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE record_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    /// Takes `quantity` units out of stock only if that many are left.
    ///
    /// Returns false, changing nothing, when stock is short. Callers run this
    /// inside their transaction so the check and the write cannot interleave
    /// with another checkout.
    pub async fn decrement_stock<'e, E>(
        executor: E,
        id: Uuid,
        quantity: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE records
               SET stock_quantity = stock_quantity - $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1 AND stock_quantity >= $2"#,
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn restock<'e, E>(executor: E, id: Uuid, quantity: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE records
               SET stock_quantity = stock_quantity + $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_low_stock(pool: &SqlitePool, threshold: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Record>(&format!(
            r#"SELECT {RECORD_COLUMNS} FROM records
               WHERE stock_quantity <= $1
               ORDER BY stock_quantity ASC, title ASC"#
        ))
        .bind(threshold)
        .fetch_all(pool)
        .await
    }

    pub async fn count_all(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(pool)
            .await
    }
}
