//! Read side of the store: record listings and the music metadata behind them.

use db::models::{
    artist::Artist,
    band::{Band, BandWithGenre},
    composition::{Composition, Track},
    genre::Genre,
    record::{Record, RecordFilter, RecordSort, RecordSummary},
    release::Release,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: i64 = 12;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Query-string shape of the record listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct RecordQuery {
    pub search: Option<String>,
    pub genre_id: Option<Uuid>,
    pub band_id: Option<Uuid>,
    pub in_stock_only: Option<bool>,
    pub sort: Option<RecordSort>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl RecordQuery {
    /// Clamps paging and drops blank search text.
    pub fn to_filter(&self) -> (RecordFilter, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let filter = RecordFilter {
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            genre_id: self.genre_id,
            band_id: self.band_id,
            manufacturer_profile_id: None,
            in_stock_only: self.in_stock_only.unwrap_or(false),
            sort: self.sort.unwrap_or_default(),
            limit: per_page,
            offset: (page - 1).saturating_mul(per_page),
        };
        (filter, page, per_page)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RecordPage {
    pub records: Vec<RecordSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RecordDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub record: Record,
    pub release_title: Option<String>,
    pub band_id: Option<Uuid>,
    pub band_name: Option<String>,
    pub genre_name: Option<String>,
    pub manufacturer_name: Option<String>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BandDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub band: BandWithGenre,
    pub members: Vec<Artist>,
    pub releases: Vec<Release>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReleaseDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub release: Release,
    pub band_name: Option<String>,
    pub tracks: Vec<Track>,
}

pub struct CatalogService;

impl CatalogService {
    pub async fn list_records(pool: &SqlitePool, query: &RecordQuery) -> Result<RecordPage, CatalogError> {
        let (filter, page, per_page) = query.to_filter();
        let records = Record::find_summaries(pool, &filter).await?;
        let total = Record::count_matching(pool, &filter).await?;
        Ok(RecordPage {
            records,
            total,
            page,
            per_page,
            total_pages: (total + per_page - 1) / per_page,
        })
    }

    pub async fn get_record(pool: &SqlitePool, id: Uuid) -> Result<RecordDetail, CatalogError> {
        let record = Record::find_by_id(pool, id)
            .await?
            .ok_or(CatalogError::NotFound("record"))?;
        let summary = Record::find_summary_by_id(pool, id)
            .await?
            .ok_or(CatalogError::NotFound("record"))?;
        let tracks = match record.release_id {
            Some(release_id) => Composition::find_tracks_by_release_id(pool, release_id).await?,
            None => Vec::new(),
        };
        Ok(RecordDetail {
            record,
            release_title: summary.release_title,
            band_id: summary.band_id,
            band_name: summary.band_name,
            genre_name: summary.genre_name,
            manufacturer_name: summary.manufacturer_name,
            tracks,
        })
    }

    pub async fn list_genres(pool: &SqlitePool) -> Result<Vec<Genre>, CatalogError> {
        Ok(Genre::find_all(pool).await?)
    }

    pub async fn list_bands(pool: &SqlitePool) -> Result<Vec<BandWithGenre>, CatalogError> {
        Ok(Band::find_all(pool).await?)
    }

    pub async fn get_band(pool: &SqlitePool, id: Uuid) -> Result<BandDetail, CatalogError> {
        let band = Band::find_by_id(pool, id)
            .await?
            .ok_or(CatalogError::NotFound("band"))?;
        let members = Artist::find_by_band_id(pool, id).await?;
        let releases = Release::find_by_band_id(pool, id).await?;
        Ok(BandDetail {
            band,
            members,
            releases,
        })
    }

    pub async fn list_artists(pool: &SqlitePool) -> Result<Vec<Artist>, CatalogError> {
        Ok(Artist::find_all(pool).await?)
    }

    pub async fn get_release(pool: &SqlitePool, id: Uuid) -> Result<ReleaseDetail, CatalogError> {
        let release = Release::find_by_id(pool, id)
            .await?
            .ok_or(CatalogError::NotFound("release"))?;
        let band_name = match release.band_id {
            Some(band_id) => Band::find_by_id(pool, band_id).await?.map(|band| band.name),
            None => None,
        };
        let tracks = Composition::find_tracks_by_release_id(pool, id).await?;
        Ok(ReleaseDetail {
            release,
            band_name,
            tracks,
        })
    }
}
