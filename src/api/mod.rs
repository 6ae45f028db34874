mod errors;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::storage::StateStore;

/// Shared application state accessible by all handlers.
pub struct AppState {
    pub store: Arc<dyn StateStore>,
}

/// Build the remote store router over `store`.
pub fn router(store: Arc<dyn StateStore>) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/tasks", post(handlers::provision_task))
        .route(
            "/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/jobs", post(handlers::provision_job))
        .route(
            "/jobs/{id}",
            get(handlers::get_job).delete(handlers::delete_job),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the remote store server.
pub async fn serve(host: &str, port: u16, store: Arc<dyn StateStore>) -> Result<()> {
    let app = router(store);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("taskstate store listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
