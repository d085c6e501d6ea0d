//! Demo catalog for a fresh database.

use db::models::{
    artist::{Artist, UpsertArtist},
    band::{Band, UpsertBand},
    composition::{Composition, UpsertComposition},
    genre::{Genre, UpsertGenre},
    manufacturer_profile::{ManufacturerProfile, UpsertManufacturerProfile},
    record::{CreateRecord, Record, RecordType},
    release::{Release, UpsertRelease},
    user::{User, UserRole},
};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::auth::{AuthError, AuthService};

const GENRES: [&str; 5] = ["Rock", "Jazz", "Pop", "Hip-Hop", "Electronic"];
const RECORD_COUNT: usize = 25;
const TRACKS_PER_RELEASE: usize = 5;
const RNG_SEED: u64 = 0x5EED_CAFE;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// What a seeding run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub genres: usize,
    pub bands: usize,
    pub releases: usize,
    pub compositions: usize,
    pub records: usize,
}

pub struct SeedService;

impl SeedService {
    /// Seeds the store unless an admin already exists. Returns None when skipped.
    pub async fn seed_if_empty(
        pool: &SqlitePool,
        auth: &AuthService,
        admin_password: &str,
    ) -> Result<Option<SeedReport>, SeedError> {
        if User::exists_with_role(pool, UserRole::Admin).await? {
            info!("Admin account present, skipping seed");
            return Ok(None);
        }

        info!("No admin account found, seeding demo catalog");
        let mut rng = StdRng::seed_from_u64(RNG_SEED);
        let mut report = SeedReport::default();

        auth.create_user(pool, "admin", "admin@vinyl-store.local", admin_password, UserRole::Admin)
            .await?;

        let mut genres = Vec::new();
        for name in GENRES {
            let genre = Genre::create(pool, &UpsertGenre { name: name.to_string() }, Uuid::new_v4()).await?;
            genres.push(genre);
        }
        report.genres = genres.len();

        let mut releases = Vec::new();
        for (i, genre) in genres.iter().enumerate() {
            let n = i + 1;
            let artist = Artist::create(
                pool,
                &UpsertArtist {
                    name: format!("Artist {n}"),
                    bio: Some("Artist biography".to_string()),
                },
                Uuid::new_v4(),
            )
            .await?;
            let band = Band::create(
                pool,
                &UpsertBand {
                    name: format!("Band {n}"),
                    bio: Some("Band description".to_string()),
                    genre_id: Some(genre.id),
                    member_ids: Some(vec![artist.id]),
                },
                Uuid::new_v4(),
            )
            .await?;
            report.bands += 1;

            let mut composition_ids = Vec::new();
            for j in 1..=TRACKS_PER_RELEASE {
                let composition = Composition::create(
                    pool,
                    &UpsertComposition {
                        title: format!("Song {n}.{j}"),
                        duration_seconds: Some(rng.gen_range(120..=300)),
                        author_band_id: Some(band.id),
                    },
                    Uuid::new_v4(),
                )
                .await?;
                composition_ids.push(composition.id);
            }
            report.compositions += composition_ids.len();

            let release = Release::create(
                pool,
                &UpsertRelease {
                    title: format!("Release {n}"),
                    release_year: Some(2000 + i as i64),
                    cover_image_url: Some(format!("release_{n}.jpg")),
                    band_id: Some(band.id),
                    composition_ids: Some(composition_ids),
                },
                Uuid::new_v4(),
            )
            .await?;
            releases.push(release);
        }
        report.releases = releases.len();

        let manufacturer = auth
            .create_user(
                pool,
                "manufacturer1",
                "manufacturer1@vinyl-store.local",
                "password",
                UserRole::Manufacturer,
            )
            .await?;
        let profile = ManufacturerProfile::upsert(
            pool,
            manufacturer.id,
            &UpsertManufacturerProfile {
                company_name: "Vinyl Factory".to_string(),
                company_address: Some("123 Music Ave".to_string()),
            },
        )
        .await?;

        for i in 1..=RECORD_COUNT {
            let Some(release) = releases.choose(&mut rng) else {
                break;
            };
            let data = CreateRecord {
                title: format!("Record {i}"),
                release_year: release.release_year,
                record_type: Some(RecordType::Lp),
                price_cents: rng.gen_range(100_000..=300_000),
                stock_quantity: rng.gen_range(0..=50),
                description: Some("Record description".to_string()),
                cover_image_url: Some(format!("record_{i}.jpg")),
                release_id: Some(release.id),
                manufacturer_profile_id: Some(profile.id),
            };
            Record::create(pool, &data, Uuid::new_v4()).await?;
            report.records += 1;
        }

        info!(
            genres = report.genres,
            bands = report.bands,
            releases = report.releases,
            records = report.records,
            "Demo catalog seeded"
        );
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use db::models::record::RecordFilter;

    use super::*;
    use crate::services::test_support::TestStore;

    #[tokio::test]
    async fn seeds_once() {
        let store = TestStore::new().await;
        let report = SeedService::seed_if_empty(&store.db.pool, &store.auth, "admin123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            report,
            SeedReport {
                genres: 5,
                bands: 5,
                releases: 5,
                compositions: 25,
                records: 25,
            }
        );

        let records = Record::find_summaries(
            &store.db.pool,
            &RecordFilter {
                limit: 100,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 25);
        assert!(records.iter().all(|r| (100_000..=300_000).contains(&r.price_cents)));
        assert!(records.iter().all(|r| (0..=50).contains(&r.stock_quantity)));
        assert!(records.iter().all(|r| r.manufacturer_name.as_deref() == Some("Vinyl Factory")));

        let admin = User::find_by_username(&store.db.pool, "admin").await.unwrap().unwrap();
        assert!(store.auth.passwords().verify("admin123", &admin.password_hash));

        let again = SeedService::seed_if_empty(&store.db.pool, &store.auth, "admin123")
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(Record::count_all(&store.db.pool).await.unwrap(), 25);
    }
}
