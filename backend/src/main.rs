use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recipe_box_backend::{app, AppState, Config, LocalIdentityProvider, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure config.toml exists or set RECIPES__IDENTITY__JWT_SECRET.",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Recipe Box API Gateway");

    // Both collaborators share one database
    let store = SqliteStore::new(&config.database.url)?;
    let identity = LocalIdentityProvider::new(&config.database.url, &config.identity)?;

    if config.admin.allow_bulk_delete {
        tracing::warn!("POST /delete_users is enabled: any caller can delete every account");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState {
        config,
        identity: Arc::new(identity),
        store: Arc::new(store),
    });

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
