use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use marquee_api::{app, worker, AppState, AuthConfig};
use marquee_core::LogMailer;
use marquee_store::app_config::Config;
use marquee_store::{DbClient, PgBookingLedger, PgEventRepository, PgReminderRepository, PgUserRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let mailer = Arc::new(LogMailer::new(config.notifications.from_address.clone()));

    let app_state = AppState {
        ledger: Arc::new(PgBookingLedger::new(db.pool.clone())),
        events: Arc::new(PgEventRepository::new(db.pool.clone())),
        users: Arc::new(PgUserRepository::new(db.pool.clone())),
        mailer: mailer.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    if config.notifications.reminders_enabled {
        tokio::spawn(worker::start_reminder_worker(
            Arc::new(PgReminderRepository::new(db.pool.clone())),
            mailer,
            Duration::from_secs(config.notifications.reminder_interval_seconds),
        ));
    }

    let app = app(app_state, &config.cors.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
