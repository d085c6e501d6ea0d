use std::{str::FromStr, time::Duration};

use sqlx::{
    Error, Pool, Sqlite,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

pub mod models;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Handle to the store database. Cheap to clone.
#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Opens (creating if needed) the database at `database_url` and applies migrations.
    pub async fn new(database_url: &str) -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        Self::migrate(&pool).await?;
        info!(database_url, "Database ready");
        Ok(DBService { pool })
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // one connection that never expires, or the database disappears with it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(&pool).await?;
        Ok(DBService { pool })
    }

    async fn migrate(pool: &Pool<Sqlite>) -> Result<(), Error> {
        MIGRATOR.run(pool).await?;
        Ok(())
    }
}

/// True when `err` is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &Error) -> bool {
    matches!(err, Error::Database(db_err) if db_err.is_unique_violation())
}

/// True when `err` is a FOREIGN KEY constraint violation.
pub fn is_foreign_key_violation(err: &Error) -> bool {
    matches!(err, Error::Database(db_err) if db_err.is_foreign_key_violation())
}
