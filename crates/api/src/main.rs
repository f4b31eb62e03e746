//! MailWatch API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use mailwatch_common::config::AppConfig;
use mailwatch_common::db::create_pool;
use mailwatch_notifier::service::TelegramService;

use mailwatch_api::routes::create_router;
use mailwatch_api::state::AppState;
use mailwatch_api::store::PgMailStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("mailwatch_api=debug,mailwatch_notifier=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting MailWatch API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    let settings = config.notification_settings();
    if settings.destination.is_enabled() {
        tracing::info!(
            chats = settings.destination.chat_ids.len(),
            "Telegram notifications enabled"
        );
    } else {
        tracing::warn!("TG_BOT_TOKEN or TG_CHAT_ID not set, Telegram notifications disabled");
    }

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;

    let notifier = Arc::new(TelegramService::from_config(&config)?);
    let port = config.port;

    // Build application state
    let state = AppState::new(Arc::new(PgMailStore::new(pool)), notifier, config);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
