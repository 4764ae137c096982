use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley::{config::ServerConfig, gateway::Gateway, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Parley chat server...");

    let config = ServerConfig::from_env();
    let gateway = Arc::new(Gateway::new());

    let app = Router::new()
        .route("/", get(root))
        .route("/ws", get(ws::ws_handler))
        .layer(config.cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(gateway);

    let addr = config.socket_addr();
    if let Some(url) = &config.public_ws_url {
        tracing::info!("Clients connect via {}", url);
    }
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Parley chat backend" }))
}
