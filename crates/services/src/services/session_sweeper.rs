//! Background removal of expired browser sessions and the carts they hold.

use std::time::Duration;

use chrono::Utc;
use db::{DBService, models::web_session::WebSession};
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum SessionSweepError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct SessionSweeper {
    db: DBService,
    poll_interval: Duration,
}

impl SessionSweeper {
    pub fn new(db: DBService, poll_interval: Duration) -> Self {
        Self { db, poll_interval }
    }

    /// Spawn the sweeper; it runs until the runtime shuts down.
    pub fn spawn(db: DBService, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
        let service = Self::new(db, poll_interval);
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!("Starting session sweeper with interval {:?}", self.poll_interval);

        let mut interval = interval(self.poll_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Error sweeping expired sessions: {}", e);
            }
        }
    }

    /// Deletes every session past its expiry. Returns how many went.
    pub async fn sweep(&self) -> Result<u64, SessionSweepError> {
        let removed = WebSession::delete_expired(&self.db.pool, Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Swept expired sessions");
        } else {
            debug!("Session sweep: nothing expired");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn sweep_removes_only_expired_sessions() {
        let db = DBService::new_in_memory().await.unwrap();
        let live = WebSession::create(&db.pool, Uuid::new_v4(), Utc::now() + ChronoDuration::hours(1))
            .await
            .unwrap();
        WebSession::create(&db.pool, Uuid::new_v4(), Utc::now() - ChronoDuration::minutes(5))
            .await
            .unwrap();

        let sweeper = SessionSweeper::new(db.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep().await.unwrap(), 1);
        assert_eq!(sweeper.sweep().await.unwrap(), 0);
        assert!(
            WebSession::find_active(&db.pool, live.id, Utc::now())
                .await
                .unwrap()
                .is_some()
        );
    }
}
