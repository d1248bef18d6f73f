pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod test_util;

pub use auth::AuthContext;
pub use config::Config;
pub use error::ApiError;
pub use identity::{IdentityProvider, LocalIdentityProvider};
pub use store::{DocumentStore, SqliteStore};

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Account credentials and bearer tokens.
    pub identity: Arc<dyn IdentityProvider>,
    /// The `users` and `recipes` collections.
    pub store: Arc<dyn DocumentStore>,
}

/// Build the full HTTP application: routes, request logging, CORS and tracing.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    routes::router(&state.config)
        .layer(axum::middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match config.origin_list() {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let origins = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect::<Vec<_>>();
            layer.allow_origin(AllowOrigin::list(origins))
        }
    }
}
