//! # pawmart-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the PawMart storefront.
//! Binds to the configured port (default 8080).

use pawmart_api::config::AppConfig;
use pawmart_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing. LOG_FORMAT=json switches to JSON lines.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");
    let port = config.port;

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = pawmart_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let mail = match pawmart_mail::MailConfig::from_env() {
        Ok(mail_config) => match pawmart_mail::MailClient::new(mail_config) {
            Ok(client) => {
                tracing::info!("Mail client configured");
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to create mail client: {e}");
                return Err(e.into());
            }
        },
        Err(pawmart_mail::config::ConfigError::MissingApiKey) => {
            tracing::warn!("MAIL_API_KEY not set. Transactional email is disabled.");
            None
        }
        Err(e) => {
            tracing::error!("Invalid mail configuration: {e}");
            return Err(e.into());
        }
    };

    let state = AppState::with_config(config, mail, db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = pawmart_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("PawMart API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
