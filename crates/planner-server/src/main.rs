//! Entry point for the planner-server binary.

use std::sync::Arc;

use axum::middleware;
use http::HeaderValue;
use planner_server::{
    config::ServerConfig,
    middleware::request_id::{make_request_span, propagate_request_id, request_id_layer},
    routes,
    state::AppState,
};
use planner_store::{
    BoardRepository, DocumentStore, MemoryDocumentStore, MemoryStore, PgDocumentStore, Store,
    StoreConfig,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    tracing::info!("Starting planner-server");
    tracing::info!(
        port = config.port,
        log_level = %config.log_level,
        environment = ?config.environment,
        "Configuration loaded"
    );

    // Relational store
    let repo: Arc<dyn BoardRepository> = match &config.database_url {
        Some(_) => {
            let store = Store::connect(StoreConfig::from_env()?).await?;
            tracing::info!("Connected to relational database");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory relational store");
            Arc::new(MemoryStore::new())
        }
    };

    // Document store
    let documents: Arc<dyn DocumentStore> = match &config.document_database_url {
        Some(_) => {
            let store =
                PgDocumentStore::connect(StoreConfig::from_env_url("DOCUMENT_DATABASE_URL")?)
                    .await?;
            tracing::info!("Connected to document database");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DOCUMENT_DATABASE_URL not set, using in-memory document store");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    // Build application state
    let state = AppState::new(repo, documents, config.clone())?;

    // Build CORS layer
    let cors = build_cors_layer(&config.cors_allowed_origins);

    // Request ids are assigned outermost so the trace span can record them.
    let app = routes::build_router(state.clone())
        .layer(middleware::from_fn(propagate_request_id))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(request_id_layer());

    // Create listener
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build CORS layer from configuration. Unparseable origins are skipped.
fn build_cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %s, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
