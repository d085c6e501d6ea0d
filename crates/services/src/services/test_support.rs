use chrono::{Duration, Utc};
use db::{
    DBService,
    models::{
        record::{CreateRecord, Record, RecordType},
        user::{User, UserRole},
        web_session::WebSession,
    },
};
use uuid::Uuid;

use super::auth::{AuthService, PasswordService};

pub fn record_fixture(title: &str, price_cents: i64, stock_quantity: i64) -> Record {
    Record {
        id: Uuid::new_v4(),
        title: title.to_string(),
        release_year: None,
        record_type: RecordType::Lp,
        price_cents,
        stock_quantity,
        description: None,
        cover_image_url: None,
        release_id: None,
        manufacturer_profile_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub struct TestStore {
    pub db: DBService,
    pub auth: AuthService,
}

impl TestStore {
    pub async fn new() -> Self {
        Self::with_db(DBService::new_in_memory().await.unwrap())
    }

    pub fn with_db(db: DBService) -> Self {
        Self {
            db,
            auth: AuthService::new(PasswordService::new(4).unwrap()),
        }
    }

    pub async fn record(&self, title: &str, price_cents: i64, stock_quantity: i64) -> Record {
        let data = CreateRecord {
            title: title.to_string(),
            release_year: Some(1970),
            record_type: None,
            price_cents,
            stock_quantity,
            description: None,
            cover_image_url: None,
            release_id: None,
            manufacturer_profile_id: None,
        };
        Record::create(&self.db.pool, &data, Uuid::new_v4()).await.unwrap()
    }

    pub async fn session(&self) -> WebSession {
        WebSession::create(&self.db.pool, Uuid::new_v4(), Utc::now() + Duration::hours(1))
            .await
            .unwrap()
    }

    pub async fn user(&self, username: &str, role: UserRole) -> User {
        self.auth
            .create_user(
                &self.db.pool,
                username,
                &format!("{username}@example.com"),
                "1234",
                role,
            )
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, record_id: Uuid) -> i64 {
        Record::find_by_id(&self.db.pool, record_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }
}
