use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;
use playbook_core::config::Config;
use playbook_core::session::Session;
use playbook_core::store::FileStore;

#[derive(serde::Deserialize)]
pub struct CompleteStepBody {
    pub user_id: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

/// POST /api/playbooks/:slug/steps/:step_id/complete — record a response
/// and advance the journey.
pub async fn complete_step(
    State(app): State<AppState>,
    Path((slug, step_id)): Path<(String, String)>,
    Json(body): Json<CompleteStepBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let session = Session::new(FileStore::new(root));
        let outcome = session.complete_step(&body.user_id, &slug, &step_id, body.response)?;
        Ok::<_, playbook_core::PlaybookError>(serde_json::json!({
            "journey": outcome.journey,
            "next_available": outcome.next_available,
        }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// GET /api/users/:user_id/journeys — all journeys for a user.
pub async fn list_journeys(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let session = Session::new(FileStore::new(root));
        let journeys = session.journeys(&user_id)?;
        Ok::<_, playbook_core::PlaybookError>(serde_json::json!(journeys))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// GET /api/users/:user_id/journeys/active — the journey to resume, or null.
/// The tie-break between several in-progress journeys comes from config.
pub async fn active_journey(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let config = Config::load(&root)?;
        let session = Session::with_policy(FileStore::new(root), config.active_journey);
        let journey = session.active_journey(&user_id)?;
        Ok::<_, playbook_core::PlaybookError>(serde_json::json!(journey))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
