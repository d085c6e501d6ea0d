//! Back-office operations: dashboard figures, catalog maintenance and account management.

use db::models::{
    artist::{Artist, UpsertArtist},
    band::{Band, BandWithGenre, UpsertBand},
    composition::{Composition, UpsertComposition},
    genre::{Genre, UpsertGenre},
    manufacturer_profile::{ManufacturerProfile, ManufacturerWithUser, UpsertManufacturerProfile},
    order::{Order, StatusCount},
    record::{CreateRecord, Record, RecordFilter, RecordSort, RecordSummary, UpdateRecord},
    release::{Release, UpsertRelease},
    user::{RoleCount, User, UserRole},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    auth::{AuthError, AuthService},
    inventory::{InventoryError, validate_new_record, validate_record_patch},
};

pub const LOW_STOCK_THRESHOLD: i64 = 3;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AdminError {
    fn from(e: sqlx::Error) -> Self {
        if db::is_unique_violation(&e) {
            AdminError::Conflict("an entry with that name already exists".to_string())
        } else if db::is_foreign_key_violation(&e) {
            AdminError::Conflict("the entry references, or is referenced by, other data".to_string())
        } else {
            AdminError::Database(e)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Dashboard {
    pub users_by_role: Vec<RoleCount>,
    pub record_count: i64,
    pub low_stock: Vec<Record>,
    pub orders_by_status: Vec<StatusCount>,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateManufacturer {
    pub username: String,
    pub email: String,
    pub password: String,
    pub company_name: String,
    pub company_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChangeRole {
    pub role: UserRole,
}

fn required(value: &str, field: &str) -> Result<String, AdminError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AdminError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn found<T>(value: Option<T>, what: &'static str) -> Result<T, AdminError> {
    value.ok_or(AdminError::NotFound(what))
}

fn deleted(rows: u64, what: &'static str) -> Result<(), AdminError> {
    if rows == 0 {
        return Err(AdminError::NotFound(what));
    }
    info!(entity = what, "Deleted");
    Ok(())
}

pub struct AdminService;

impl AdminService {
    pub async fn dashboard(pool: &SqlitePool) -> Result<Dashboard, AdminError> {
        Ok(Dashboard {
            users_by_role: User::count_by_role(pool).await?,
            record_count: Record::count_all(pool).await?,
            low_stock: Record::find_low_stock(pool, LOW_STOCK_THRESHOLD).await?,
            orders_by_status: Order::count_by_status(pool).await?,
            revenue_cents: Order::revenue_cents(pool).await?,
        })
    }

    // Genres

    pub async fn list_genres(pool: &SqlitePool) -> Result<Vec<Genre>, AdminError> {
        Ok(Genre::find_all(pool).await?)
    }

    pub async fn create_genre(pool: &SqlitePool, data: &UpsertGenre) -> Result<Genre, AdminError> {
        let data = UpsertGenre {
            name: required(&data.name, "name")?,
        };
        Ok(Genre::create(pool, &data, Uuid::new_v4()).await?)
    }

    pub async fn update_genre(pool: &SqlitePool, id: Uuid, data: &UpsertGenre) -> Result<Genre, AdminError> {
        let data = UpsertGenre {
            name: required(&data.name, "name")?,
        };
        found(Genre::update(pool, id, &data).await?, "genre")
    }

    pub async fn delete_genre(pool: &SqlitePool, id: Uuid) -> Result<(), AdminError> {
        deleted(Genre::delete(pool, id).await?, "genre")
    }

    // Artists

    pub async fn list_artists(pool: &SqlitePool) -> Result<Vec<Artist>, AdminError> {
        Ok(Artist::find_all(pool).await?)
    }

    pub async fn create_artist(pool: &SqlitePool, data: &UpsertArtist) -> Result<Artist, AdminError> {
        let data = UpsertArtist {
            name: required(&data.name, "name")?,
            bio: data.bio.clone(),
        };
        Ok(Artist::create(pool, &data, Uuid::new_v4()).await?)
    }

    pub async fn update_artist(pool: &SqlitePool, id: Uuid, data: &UpsertArtist) -> Result<Artist, AdminError> {
        let data = UpsertArtist {
            name: required(&data.name, "name")?,
            bio: data.bio.clone(),
        };
        found(Artist::update(pool, id, &data).await?, "artist")
    }

    pub async fn delete_artist(pool: &SqlitePool, id: Uuid) -> Result<(), AdminError> {
        deleted(Artist::delete(pool, id).await?, "artist")
    }

    // Bands

    pub async fn list_bands(pool: &SqlitePool) -> Result<Vec<BandWithGenre>, AdminError> {
        Ok(Band::find_all(pool).await?)
    }

    pub async fn create_band(pool: &SqlitePool, data: &UpsertBand) -> Result<Band, AdminError> {
        let data = UpsertBand {
            name: required(&data.name, "name")?,
            ..data.clone()
        };
        Ok(Band::create(pool, &data, Uuid::new_v4()).await?)
    }

    pub async fn update_band(pool: &SqlitePool, id: Uuid, data: &UpsertBand) -> Result<Band, AdminError> {
        let data = UpsertBand {
            name: required(&data.name, "name")?,
            ..data.clone()
        };
        found(Band::update(pool, id, &data).await?, "band")
    }

    pub async fn delete_band(pool: &SqlitePool, id: Uuid) -> Result<(), AdminError> {
        deleted(Band::delete(pool, id).await?, "band")
    }

    // Compositions

    pub async fn list_compositions(pool: &SqlitePool) -> Result<Vec<Composition>, AdminError> {
        Ok(Composition::find_all(pool).await?)
    }

    pub async fn create_composition(
        pool: &SqlitePool,
        data: &UpsertComposition,
    ) -> Result<Composition, AdminError> {
        let data = Self::checked_composition(data)?;
        Ok(Composition::create(pool, &data, Uuid::new_v4()).await?)
    }

    pub async fn update_composition(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpsertComposition,
    ) -> Result<Composition, AdminError> {
        let data = Self::checked_composition(data)?;
        found(Composition::update(pool, id, &data).await?, "composition")
    }

    pub async fn delete_composition(pool: &SqlitePool, id: Uuid) -> Result<(), AdminError> {
        deleted(Composition::delete(pool, id).await?, "composition")
    }

    fn checked_composition(data: &UpsertComposition) -> Result<UpsertComposition, AdminError> {
        if data.duration_seconds.is_some_and(|seconds| seconds <= 0) {
            return Err(AdminError::Validation("duration must be positive".to_string()));
        }
        Ok(UpsertComposition {
            title: required(&data.title, "title")?,
            ..data.clone()
        })
    }

    // Releases

    pub async fn list_releases(pool: &SqlitePool) -> Result<Vec<Release>, AdminError> {
        Ok(Release::find_all(pool).await?)
    }

    pub async fn create_release(pool: &SqlitePool, data: &UpsertRelease) -> Result<Release, AdminError> {
        let data = UpsertRelease {
            title: required(&data.title, "title")?,
            ..data.clone()
        };
        Ok(Release::create(pool, &data, Uuid::new_v4()).await?)
    }

    pub async fn update_release(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpsertRelease,
    ) -> Result<Release, AdminError> {
        let data = UpsertRelease {
            title: required(&data.title, "title")?,
            ..data.clone()
        };
        found(Release::update(pool, id, &data).await?, "release")
    }

    pub async fn delete_release(pool: &SqlitePool, id: Uuid) -> Result<(), AdminError> {
        deleted(Release::delete(pool, id).await?, "release")
    }

    // Records

    pub async fn list_records(pool: &SqlitePool) -> Result<Vec<RecordSummary>, AdminError> {
        let filter = RecordFilter {
            sort: RecordSort::Title,
            limit: i64::MAX,
            ..Default::default()
        };
        Ok(Record::find_summaries(pool, &filter).await?)
    }

    pub async fn create_record(pool: &SqlitePool, data: &CreateRecord) -> Result<Record, AdminError> {
        let data = CreateRecord {
            title: data.title.trim().to_string(),
            ..data.clone()
        };
        validate_new_record(pool, &data).await?;
        if let Some(profile_id) = data.manufacturer_profile_id {
            found(ManufacturerProfile::find_by_id(pool, profile_id).await?, "manufacturer")?;
        }
        let record = Record::create(pool, &data, Uuid::new_v4()).await?;
        info!(record_id = %record.id, "Record created by admin");
        Ok(record)
    }

    pub async fn update_record(pool: &SqlitePool, id: Uuid, patch: &UpdateRecord) -> Result<Record, AdminError> {
        validate_record_patch(pool, patch).await?;
        found(Record::update(pool, id, patch).await?, "record")
    }

    pub async fn delete_record(pool: &SqlitePool, id: Uuid) -> Result<(), AdminError> {
        if Record::has_order_items(pool, id).await? {
            return Err(InventoryError::Referenced.into());
        }
        deleted(Record::delete(pool, id).await?, "record")
    }

    // Manufacturers

    pub async fn list_manufacturers(pool: &SqlitePool) -> Result<Vec<ManufacturerWithUser>, AdminError> {
        Ok(ManufacturerProfile::find_all_with_users(pool).await?)
    }

    /// Creates a manufacturer account together with its company profile.
    pub async fn create_manufacturer(
        pool: &SqlitePool,
        auth: &AuthService,
        data: &CreateManufacturer,
    ) -> Result<ManufacturerProfile, AdminError> {
        let username = required(&data.username, "username")?;
        let email = required(&data.email, "email")?.to_lowercase();
        let company_name = required(&data.company_name, "company name")?;
        if data.password.is_empty() {
            return Err(AdminError::Validation("password is required".to_string()));
        }

        let new_user = auth
            .prepare_user(pool, &username, &email, &data.password, UserRole::Manufacturer)
            .await?;

        let mut tx = pool.begin().await?;
        let user = User::create(&mut *tx, &new_user, Uuid::new_v4())
            .await
            .map_err(AuthError::from_insert)?;
        let profile = ManufacturerProfile::upsert(
            &mut *tx,
            user.id,
            &UpsertManufacturerProfile {
                company_name,
                company_address: data.company_address.clone(),
            },
        )
        .await?;
        tx.commit().await?;
        info!(user_id = %user.id, manufacturer_profile_id = %profile.id, "Manufacturer created");
        Ok(profile)
    }

    // Users

    pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>, AdminError> {
        Ok(User::find_all(pool).await?)
    }

    pub async fn change_role(
        pool: &SqlitePool,
        acting: &User,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<User, AdminError> {
        if acting.id == user_id && role != UserRole::Admin {
            return Err(AdminError::Validation("you cannot remove your own admin role".to_string()));
        }
        let user = found(User::update_role(pool, user_id, role).await?, "user")?;
        info!(user_id = %user.id, role = %role, changed_by = %acting.id, "User role changed");
        Ok(user)
    }

    pub async fn delete_user(pool: &SqlitePool, acting: &User, user_id: Uuid) -> Result<(), AdminError> {
        if acting.id == user_id {
            return Err(AdminError::Validation("you cannot delete your own account".to_string()));
        }
        deleted(User::delete(pool, user_id).await?, "user")
    }
}

#[cfg(test)]
mod tests {
    use db::models::{order::OrderStatus, user::UserRole};

    use super::*;
    use crate::services::test_support::TestStore;

    #[tokio::test]
    async fn dashboard_counts() {
        let store = TestStore::new().await;
        store.user("boss", UserRole::Admin).await;
        store.user("buyer", UserRole::Customer).await;
        store.user("buyer2", UserRole::Customer).await;
        store.record("Plenty", 1000, 20).await;
        store.record("Almost gone", 1000, 2).await;

        let dashboard = AdminService::dashboard(&store.db.pool).await.unwrap();
        assert_eq!(dashboard.record_count, 2);
        assert_eq!(dashboard.low_stock.len(), 1);
        assert_eq!(dashboard.low_stock[0].title, "Almost gone");
        let customers = dashboard
            .users_by_role
            .iter()
            .find(|count| count.role == UserRole::Customer)
            .map(|count| count.count);
        assert_eq!(customers, Some(2));
        assert_eq!(dashboard.revenue_cents, 0);
        assert!(
            !dashboard
                .orders_by_status
                .iter()
                .any(|count| count.status == OrderStatus::Processing)
        );
    }

    #[tokio::test]
    async fn duplicate_names_conflict_and_blank_names_fail() {
        let store = TestStore::new().await;
        let rock = UpsertGenre {
            name: "Rock".to_string(),
        };
        AdminService::create_genre(&store.db.pool, &rock).await.unwrap();
        assert!(matches!(
            AdminService::create_genre(&store.db.pool, &rock).await,
            Err(AdminError::Conflict(_))
        ));
        assert!(matches!(
            AdminService::create_genre(&store.db.pool, &UpsertGenre { name: "  ".to_string() }).await,
            Err(AdminError::Validation(_))
        ));
        assert!(matches!(
            AdminService::delete_genre(&store.db.pool, Uuid::new_v4()).await,
            Err(AdminError::NotFound("genre"))
        ));
    }

    #[tokio::test]
    async fn band_with_releases_cannot_be_deleted() {
        let store = TestStore::new().await;
        let artist = AdminService::create_artist(
            &store.db.pool,
            &UpsertArtist {
                name: "Freddie Mercury".to_string(),
                bio: None,
            },
        )
        .await
        .unwrap();
        let band = AdminService::create_band(
            &store.db.pool,
            &UpsertBand {
                name: "Queen".to_string(),
                bio: None,
                genre_id: None,
                member_ids: Some(vec![artist.id]),
            },
        )
        .await
        .unwrap();
        AdminService::create_release(
            &store.db.pool,
            &UpsertRelease {
                title: "A Night at the Opera".to_string(),
                release_year: Some(1975),
                cover_image_url: None,
                band_id: Some(band.id),
                composition_ids: None,
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            AdminService::delete_band(&store.db.pool, band.id).await,
            Err(AdminError::Conflict(_))
        ));
        assert_eq!(Artist::find_by_band_id(&store.db.pool, band.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn manufacturer_creation_makes_user_and_profile() {
        let store = TestStore::new().await;
        let profile = AdminService::create_manufacturer(
            &store.db.pool,
            &store.auth,
            &CreateManufacturer {
                username: "pressworks".to_string(),
                email: "Press@Example.com".to_string(),
                password: "secret".to_string(),
                company_name: "Press Works".to_string(),
                company_address: None,
            },
        )
        .await
        .unwrap();
        let user = User::find_by_id(&store.db.pool, profile.user_id).await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Manufacturer);
        assert_eq!(user.email, "press@example.com");

        let listed = AdminService::list_manufacturers(&store.db.pool).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "pressworks");
    }

    #[tokio::test]
    async fn failed_profile_insert_leaves_no_account() {
        let store = TestStore::new().await;
        sqlx::query(
            "CREATE TRIGGER refuse_profiles BEFORE INSERT ON manufacturer_profiles
             BEGIN SELECT RAISE(ABORT, 'profile insert refused'); END",
        )
        .execute(&store.db.pool)
        .await
        .unwrap();

        let result = AdminService::create_manufacturer(
            &store.db.pool,
            &store.auth,
            &CreateManufacturer {
                username: "halfmade".to_string(),
                email: "halfmade@example.com".to_string(),
                password: "secret".to_string(),
                company_name: "Half Made".to_string(),
                company_address: None,
            },
        )
        .await;

        assert!(matches!(result, Err(AdminError::Database(_))));
        assert!(
            User::find_by_email(&store.db.pool, "halfmade@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn admins_cannot_demote_or_delete_themselves() {
        let store = TestStore::new().await;
        let admin = store.user("boss", UserRole::Admin).await;
        let customer = store.user("buyer", UserRole::Customer).await;

        assert!(matches!(
            AdminService::change_role(&store.db.pool, &admin, admin.id, UserRole::Customer).await,
            Err(AdminError::Validation(_))
        ));
        assert!(matches!(
            AdminService::delete_user(&store.db.pool, &admin, admin.id).await,
            Err(AdminError::Validation(_))
        ));

        let promoted = AdminService::change_role(&store.db.pool, &admin, customer.id, UserRole::Manufacturer)
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::Manufacturer);
        AdminService::delete_user(&store.db.pool, &admin, customer.id)
            .await
            .unwrap();
        assert_eq!(AdminService::list_users(&store.db.pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_record_crud_validates() {
        let store = TestStore::new().await;
        let data = CreateRecord {
            title: " Wish You Were Here ".to_string(),
            release_year: Some(1975),
            record_type: None,
            price_cents: 2999,
            stock_quantity: 4,
            description: None,
            cover_image_url: None,
            release_id: None,
            manufacturer_profile_id: None,
        };
        let record = AdminService::create_record(&store.db.pool, &data).await.unwrap();
        assert_eq!(record.title, "Wish You Were Here");

        let bad = CreateRecord {
            price_cents: 0,
            ..data.clone()
        };
        assert!(matches!(
            AdminService::create_record(&store.db.pool, &bad).await,
            Err(AdminError::Inventory(InventoryError::Validation(_)))
        ));

        let patch = UpdateRecord {
            stock_quantity: Some(-1),
            ..Default::default()
        };
        assert!(AdminService::update_record(&store.db.pool, record.id, &patch).await.is_err());
        AdminService::delete_record(&store.db.pool, record.id).await.unwrap();
        assert!(AdminService::list_records(&store.db.pool).await.unwrap().is_empty());
    }
}
