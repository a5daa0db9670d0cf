use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timeplaner::api::router;
use timeplaner::portal::{HttpTransport, PortalConfig, TimetableManager};
use timeplaner::services::stale_window_from_env;
use timeplaner::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "timeplaner=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://timetables.db?mode=rwc".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let config = PortalConfig::new_from_env()?;
    info!(
        year = config.year,
        list_url = %config.list_url,
        show_url = %config.show_url,
        "Portal configured"
    );

    let stale_after = stale_window_from_env()?;
    let transport = Arc::new(HttpTransport::new()?);

    let state = AppState {
        db: pool.clone(),
        manager: Arc::new(TimetableManager::new(transport, config)),
        stale_after,
    };

    // A failed scrape shouldn't keep the cached data from being served.
    if let Err(e) = state.refresh_service().seed_courses().await {
        warn!("Initial course list scrape failed: {}", e);
    }

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:4999".to_string())
        .parse()?;

    let app = router(state);

    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
