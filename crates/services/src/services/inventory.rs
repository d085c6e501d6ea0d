//! Manufacturer-side stock management: a manufacturer's own records and company profile.

use db::models::{
    manufacturer_profile::{ManufacturerProfile, UpsertManufacturerProfile},
    record::{CreateRecord, Record, RecordFilter, RecordSort, RecordSummary, RecordType, UpdateRecord},
    release::Release,
    user::User,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("manufacturer profile required")]
    NoProfile,
    #[error("record not found")]
    NotFound,
    #[error("record has been ordered and cannot be deleted")]
    Referenced,
}

/// Record fields a manufacturer supplies; ownership comes from the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RecordInput {
    pub title: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub release_id: Option<Uuid>,
    pub record_type: Option<RecordType>,
    pub release_year: Option<i64>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
}

impl RecordInput {
    pub fn into_create(self, manufacturer_profile_id: Option<Uuid>) -> CreateRecord {
        CreateRecord {
            title: self.title.trim().to_string(),
            release_year: self.release_year,
            record_type: self.record_type,
            price_cents: self.price_cents,
            stock_quantity: self.stock_quantity,
            description: self.description,
            cover_image_url: self.cover_image_url,
            release_id: self.release_id,
            manufacturer_profile_id,
        }
    }
}

/// Field rules shared by manufacturer and admin record editing.
pub async fn validate_new_record(pool: &SqlitePool, data: &CreateRecord) -> Result<(), InventoryError> {
    check_fields(
        Some(data.title.as_str()),
        Some(data.price_cents),
        Some(data.stock_quantity),
    )?;
    check_release(pool, data.release_id).await
}

pub async fn validate_record_patch(pool: &SqlitePool, patch: &UpdateRecord) -> Result<(), InventoryError> {
    check_fields(patch.title.as_deref(), patch.price_cents, patch.stock_quantity)?;
    check_release(pool, patch.release_id).await
}

fn check_fields(
    title: Option<&str>,
    price_cents: Option<i64>,
    stock_quantity: Option<i64>,
) -> Result<(), InventoryError> {
    if title.is_some_and(|title| title.trim().is_empty()) {
        return Err(InventoryError::Validation("title is required".to_string()));
    }
    if price_cents.is_some_and(|price| price <= 0) {
        return Err(InventoryError::Validation("price must be greater than zero".to_string()));
    }
    if stock_quantity.is_some_and(|stock| stock < 0) {
        return Err(InventoryError::Validation("stock cannot be negative".to_string()));
    }
    Ok(())
}

async fn check_release(pool: &SqlitePool, release_id: Option<Uuid>) -> Result<(), InventoryError> {
    let Some(release_id) = release_id else {
        return Ok(());
    };
    if Release::find_by_id(pool, release_id).await?.is_none() {
        return Err(InventoryError::Validation("release does not exist".to_string()));
    }
    Ok(())
}

pub struct InventoryService;

impl InventoryService {
    pub async fn profile_for(pool: &SqlitePool, user: &User) -> Result<ManufacturerProfile, InventoryError> {
        ManufacturerProfile::find_by_user_id(pool, user.id)
            .await?
            .ok_or(InventoryError::NoProfile)
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        user: &User,
        data: &UpsertManufacturerProfile,
    ) -> Result<ManufacturerProfile, InventoryError> {
        let company_name = data.company_name.trim();
        if company_name.is_empty() {
            return Err(InventoryError::Validation("company name is required".to_string()));
        }
        let data = UpsertManufacturerProfile {
            company_name: company_name.to_string(),
            company_address: data
                .company_address
                .as_deref()
                .map(str::trim)
                .filter(|address| !address.is_empty())
                .map(str::to_string),
        };
        Ok(ManufacturerProfile::upsert(pool, user.id, &data).await?)
    }

    pub async fn my_records(pool: &SqlitePool, user: &User) -> Result<Vec<RecordSummary>, InventoryError> {
        let profile = Self::profile_for(pool, user).await?;
        let filter = RecordFilter {
            manufacturer_profile_id: Some(profile.id),
            sort: RecordSort::Title,
            limit: i64::MAX,
            ..Default::default()
        };
        Ok(Record::find_summaries(pool, &filter).await?)
    }

    pub async fn add_record(pool: &SqlitePool, user: &User, input: RecordInput) -> Result<Record, InventoryError> {
        let profile = Self::profile_for(pool, user).await?;
        let data = input.into_create(Some(profile.id));
        validate_new_record(pool, &data).await?;
        let record = Record::create(pool, &data, Uuid::new_v4()).await?;
        info!(record_id = %record.id, manufacturer_profile_id = %profile.id, "Record added");
        Ok(record)
    }

    pub async fn update_record(
        pool: &SqlitePool,
        user: &User,
        record_id: Uuid,
        patch: &UpdateRecord,
    ) -> Result<Record, InventoryError> {
        Self::owned_record(pool, user, record_id).await?;
        validate_record_patch(pool, patch).await?;
        Record::update(pool, record_id, patch)
            .await?
            .ok_or(InventoryError::NotFound)
    }

    pub async fn delete_record(pool: &SqlitePool, user: &User, record_id: Uuid) -> Result<(), InventoryError> {
        Self::owned_record(pool, user, record_id).await?;
        if Record::has_order_items(pool, record_id).await? {
            return Err(InventoryError::Referenced);
        }
        Record::delete(pool, record_id).await?;
        info!(record_id = %record_id, user_id = %user.id, "Record deleted");
        Ok(())
    }

    /// Admins may touch any record; manufacturers only their own. Others'
    /// records look missing.
    async fn owned_record(pool: &SqlitePool, user: &User, record_id: Uuid) -> Result<Record, InventoryError> {
        let record = Record::find_by_id(pool, record_id)
            .await?
            .ok_or(InventoryError::NotFound)?;
        if user.is_admin() {
            return Ok(record);
        }
        let profile = Self::profile_for(pool, user).await?;
        if record.manufacturer_profile_id != Some(profile.id) {
            return Err(InventoryError::NotFound);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use db::models::user::UserRole;

    use super::*;
    use crate::services::test_support::TestStore;

    fn input(title: &str, price_cents: i64, stock_quantity: i64) -> RecordInput {
        RecordInput {
            title: title.to_string(),
            price_cents,
            stock_quantity,
            release_id: None,
            record_type: Some(RecordType::Ep),
            release_year: Some(2024),
            description: None,
            cover_image_url: None,
        }
    }

    async fn manufacturer(store: &TestStore, name: &str) -> User {
        let user = store.user(name, UserRole::Manufacturer).await;
        InventoryService::update_profile(
            &store.db.pool,
            &user,
            &UpsertManufacturerProfile {
                company_name: format!("{name} Pressing"),
                company_address: Some(" ".to_string()),
            },
        )
        .await
        .unwrap();
        user
    }

    #[tokio::test]
    async fn manufacturer_manages_own_records() {
        let store = TestStore::new().await;
        let maker = manufacturer(&store, "maker").await;

        let record = InventoryService::add_record(&store.db.pool, &maker, input("  New Pressing ", 1500, 10))
            .await
            .unwrap();
        assert_eq!(record.title, "New Pressing");
        assert_eq!(record.record_type, RecordType::Ep);

        let mine = InventoryService::my_records(&store.db.pool, &maker).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].manufacturer_name.as_deref(), Some("maker Pressing"));

        let updated = InventoryService::update_record(
            &store.db.pool,
            &maker,
            record.id,
            &UpdateRecord {
                stock_quantity: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.stock_quantity, 3);
        assert_eq!(updated.price_cents, 1500);

        InventoryService::delete_record(&store.db.pool, &maker, record.id)
            .await
            .unwrap();
        assert!(InventoryService::my_records(&store.db.pool, &maker).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let store = TestStore::new().await;
        let maker = manufacturer(&store, "maker").await;
        for bad in [input("", 1500, 1), input("X", 0, 1), input("X", 1500, -1)] {
            let err = InventoryService::add_record(&store.db.pool, &maker, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, InventoryError::Validation(_)));
        }

        let mut with_release = input("X", 1500, 1);
        with_release.release_id = Some(Uuid::new_v4());
        let err = InventoryService::add_record(&store.db.pool, &maker, with_release)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[tokio::test]
    async fn other_manufacturers_records_are_out_of_reach() {
        let store = TestStore::new().await;
        let owner = manufacturer(&store, "owner").await;
        let rival = manufacturer(&store, "rival").await;
        let admin = store.user("boss", UserRole::Admin).await;
        let record = InventoryService::add_record(&store.db.pool, &owner, input("Mine", 1500, 10))
            .await
            .unwrap();

        let err = InventoryService::delete_record(&store.db.pool, &rival, record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound));

        let patch = UpdateRecord {
            price_cents: Some(999),
            ..Default::default()
        };
        assert!(InventoryService::update_record(&store.db.pool, &admin, record.id, &patch).await.is_ok());
    }

    #[tokio::test]
    async fn ordered_records_cannot_be_deleted() {
        let store = TestStore::new().await;
        let maker = manufacturer(&store, "maker").await;
        let buyer = store.user("buyer", UserRole::Customer).await;
        let record = InventoryService::add_record(&store.db.pool, &maker, input("Popular", 1500, 10))
            .await
            .unwrap();

        let order = db::models::order::Order::create(
            &store.db.pool,
            &db::models::order::CreateOrder {
                user_id: buyer.id,
                payment_method: db::models::order::PaymentMethod::Card,
                shipping_address: "Addr".to_string(),
                total_cents: 1500,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        db::models::order::OrderItem::create(&store.db.pool, order.id, record.id, 1, 1500)
            .await
            .unwrap();

        let err = InventoryService::delete_record(&store.db.pool, &maker, record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Referenced));
    }

    #[tokio::test]
    async fn profile_is_required_and_editable() {
        let store = TestStore::new().await;
        let bare = store.user("bare", UserRole::Manufacturer).await;
        assert!(matches!(
            InventoryService::my_records(&store.db.pool, &bare).await,
            Err(InventoryError::NoProfile)
        ));

        let profile = InventoryService::update_profile(
            &store.db.pool,
            &bare,
            &UpsertManufacturerProfile {
                company_name: "Bare Records".to_string(),
                company_address: Some("Press lane 1".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(profile.company_address.as_deref(), Some("Press lane 1"));
        assert_eq!(
            InventoryService::profile_for(&store.db.pool, &bare).await.unwrap().id,
            profile.id
        );
    }
}
