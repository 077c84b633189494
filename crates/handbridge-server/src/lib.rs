pub mod error;
pub mod routes;
pub mod state;
pub mod worker;

use axum::routing::{delete, get, post, put};
use axum::Router;
use handbridge_core::config::Config;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware around `state`.
pub fn router(state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        // Ingestion
        .route("/api/signals/receive", post(routes::ingest::receive_signals))
        .route("/receive_signals", post(routes::ingest::receive_signals))
        .route("/api/triggers", get(routes::triggers::list_triggers))
        .route("/api/triggers/{name}", post(routes::triggers::feed_trigger))
        // Signal domains
        .route("/api/signals", get(routes::signals::list_signals))
        .route("/api/signals", post(routes::signals::create_signal))
        .route("/api/signals/{name}", get(routes::signals::get_signal))
        .route("/api/signals/{name}", put(routes::signals::put_signal))
        .route("/api/signals/{name}", delete(routes::signals::delete_signal))
        // Mapping
        .route("/api/mapping", get(routes::mapping::get_mapping))
        .route("/api/mapping", put(routes::mapping::put_mapping))
        .route("/api/mapping/{key}", delete(routes::mapping::delete_mapping))
        // Status and config
        .route("/api/status", get(routes::status::get_status))
        .route("/api/config", get(routes::config::get_config))
        .route(
            "/api/config/warnings",
            get(routes::config::get_config_warnings),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Router backed by the HTTP actuator and gesture services named in
/// `config`. Starts the dispatch worker.
pub fn build_router(root: PathBuf, config: Config) -> Router {
    router(state::AppState::new(root, config))
}

/// Start the server on `config.server.port` until the process is stopped.
pub async fn serve(root: PathBuf, config: Config) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, config, listener).await
}

/// Start the server on a pre-bound listener.
///
/// The caller can read the actual port before starting (useful when binding
/// port 0 and letting the OS pick).
pub async fn serve_on(
    root: PathBuf,
    config: Config,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let state = state::AppState::new(root, config);
    let signals = state.store.domains().len();
    let app = router(state);

    tracing::info!(signals, "handbridge listening on http://localhost:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("could not listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
