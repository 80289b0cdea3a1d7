//! HTTP server assembly: router, CORS, and the serve loop.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bot::{BotResponder, PollinationsClient};
use crate::chat::ChatHub;
use crate::config::Config;
use crate::ws::chat_ws_handler;
use crate::Result;

/// Shared application state handed to every handler.
pub struct AppState {
    /// The chat engine.
    pub hub: Arc<ChatHub>,
    /// Bot responder watching posted messages.
    pub responder: Arc<BotResponder>,
    /// Secret for verifying auth-service tokens.
    pub jwt_secret: String,
}

/// Create the main router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/ws", get(chat_ws_handler))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the CORS layer.
///
/// With no configured origins (development mode) any origin is allowed;
/// otherwise only the configured origins are.
fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let parsed_origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_origin(parsed_origins)
    }
}

/// Build the application state from configuration.
pub fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let hub = Arc::new(ChatHub::new());
    let generator = Arc::new(PollinationsClient::new(&config.bot)?);
    let responder = Arc::new(BotResponder::new(Arc::clone(&hub), generator, &config.bot));

    Ok(Arc::new(AppState {
        hub,
        responder,
        jwt_secret: config.auth.jwt_secret.clone(),
    }))
}

/// Bind and run the server until it fails or the process ends.
pub async fn serve(config: &Config) -> Result<()> {
    let state = build_state(config)?;
    let router = create_router(state, &config.server.cors_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cors_layer_empty_origins() {
        let _layer = create_cors_layer(&[]);
        // Should not panic
    }

    #[test]
    fn test_create_cors_layer_with_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        let _layer = create_cors_layer(&origins);
        // Should not panic
    }

    #[test]
    fn test_build_state_and_router() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();

        let state = build_state(&config).unwrap();
        assert_eq!(state.jwt_secret, "secret");
        let _router = create_router(state, &config.server.cors_origins);
    }
}
