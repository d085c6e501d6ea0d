pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::DBService;
use services::services::{
    auth::{AuthError, AuthService, PasswordService},
    config::Config,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    config: Arc<Config>,
    auth: AuthService,
}

impl Deployment {
    pub fn new(db: DBService, config: Config) -> Result<Self, AuthError> {
        let auth = AuthService::new(PasswordService::new(config.scrypt_log_n)?);
        Ok(Self {
            db,
            config: Arc::new(config),
            auth,
        })
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Expiry for a session touched now. Saturates at the latest representable instant.
    pub fn session_expiry(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.config.session_ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
