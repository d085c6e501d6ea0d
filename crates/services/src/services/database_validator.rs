//! Schema checks run at startup and by the health endpoint.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

/// Tables the store cannot run without.
pub const REQUIRED_TABLES: [&str; 13] = [
    "users",
    "manufacturer_profiles",
    "genres",
    "artists",
    "bands",
    "band_members",
    "compositions",
    "releases",
    "release_tracks",
    "records",
    "orders",
    "order_items",
    "web_sessions",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Database validator for ensuring schema is correct
pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check that migrations ran and every required table is present
    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let migrations_table_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
        )
        .fetch_one(&self.pool)
        .await?
            > 0;

        if !migrations_table_exists {
            warn!("Database not initialized - _sqlx_migrations table does not exist");
            return Ok(ValidationResult {
                is_initialized: false,
                migrations_applied: 0,
                pending_migrations: vec![],
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let applied: HashSet<i64> =
            sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success = 1")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();
        let pending_migrations = db::MIGRATOR
            .iter()
            .filter(|migration| !applied.contains(&migration.version))
            .map(|migration| format!("{}_{}", migration.version, migration.description))
            .collect::<Vec<_>>();
        let missing_tables = self.validate_tables(&REQUIRED_TABLES).await?;

        let result = ValidationResult {
            is_initialized: true,
            migrations_applied: applied.len(),
            pending_migrations,
            missing_tables,
        };
        if result.is_ok() {
            info!(migrations_applied = result.migrations_applied, "Database validation complete");
        } else {
            warn!("{}", result.summary());
        }
        Ok(result)
    }

    /// Returns the tables from `required_tables` that do not exist
    pub async fn validate_tables(&self, required_tables: &[&str]) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing_tables = Vec::new();

        for table in required_tables {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?
                > 0;

            if !exists {
                missing_tables.push(table.to_string());
            }
        }

        Ok(missing_tables)
    }
}

/// Result of database validation
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ValidationResult {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub pending_migrations: Vec<String>,
    pub missing_tables: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.pending_migrations.is_empty() && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "Database not initialized - migrations need to be run".to_string()
        } else if !self.pending_migrations.is_empty() {
            format!("Pending migrations: {}", self.pending_migrations.join(", "))
        } else if !self.missing_tables.is_empty() {
            format!("Missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!("Database OK - {} migrations applied", self.migrations_applied)
        }
    }
}
