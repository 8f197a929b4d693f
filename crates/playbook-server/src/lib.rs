pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(root: PathBuf) -> Router {
    let app_state = state::AppState::new(root);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Playbook templates
        .route("/api/playbooks", get(routes::playbooks::list_playbooks))
        .route("/api/playbooks", post(routes::playbooks::import_playbook))
        .route("/api/playbooks/{slug}", get(routes::playbooks::get_playbook))
        // Journeys
        .route(
            "/api/playbooks/{slug}/steps/{step_id}/complete",
            post(routes::journeys::complete_step),
        )
        .route(
            "/api/users/{user_id}/journeys",
            get(routes::journeys::list_journeys),
        )
        .route(
            "/api/users/{user_id}/journeys/active",
            get(routes::journeys::active_journey),
        )
        .layer(cors)
        .with_state(app_state)
}

/// Start the playbook API server.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let app = build_router(root);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("playbook API listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Start the playbook API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root);

    tracing::info!("playbook API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
