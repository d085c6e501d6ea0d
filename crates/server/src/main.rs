use anyhow::Context;
use db::DBService;
use server::{Deployment, routes};
use services::services::{
    config::Config, database_validator::DatabaseValidator, seed::SeedService,
    session_sweeper::SessionSweeper,
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::logging::init_tracing();

    let config = Config::from_env()?;
    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_url))?;

    let validation = DatabaseValidator::new(db.pool.clone()).validate().await?;
    if validation.is_ok() {
        info!(
            migrations_applied = validation.migrations_applied,
            "{}",
            validation.summary()
        );
    } else {
        warn!("{}", validation.summary());
    }

    let deployment = Deployment::new(db.clone(), config.clone())?;

    if config.seed_on_start {
        match SeedService::seed_if_empty(&db.pool, deployment.auth(), &config.admin_password).await {
            Ok(Some(report)) => info!(records = report.records, "Seeded demo catalog"),
            Ok(None) => info!("Catalog already populated, skipping seed"),
            Err(e) => error!("Failed to seed catalog: {}", e),
        }
    }

    SessionSweeper::spawn(db.clone(), config.session_sweep_interval);

    let app = routes::router(deployment);
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
