use axum::extract::{Path, Query, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;
use playbook_core::session::Session;
use playbook_core::store::{FileStore, StepStore};
use playbook_core::template::{PlaybookItem, PlaybookTemplate};

/// GET /api/playbooks — list all playbook templates.
pub async fn list_playbooks(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let session = Session::new(FileStore::new(root));
        let templates = session.playbooks()?;
        let list: Vec<serde_json::Value> = templates
            .iter()
            .map(|t| {
                serde_json::json!({
                    "slug": t.slug,
                    "name": t.name,
                    "description": t.description,
                    "category": t.category,
                    "steps": t.items.len(),
                    "required_steps": t.required_count(),
                    "updated_at": t.updated_at,
                })
            })
            .collect();
        Ok::<_, playbook_core::PlaybookError>(serde_json::json!(list))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct DetailsQuery {
    pub user_id: String,
}

/// GET /api/playbooks/:slug?user_id=U — one user's view of a playbook.
pub async fn get_playbook(
    State(app): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let session = Session::new(FileStore::new(root));
        let details = session.playbook_details(&query.user_id, &slug)?;
        Ok::<_, playbook_core::PlaybookError>(serde_json::json!({
            "playbook": details.template,
            "steps": details.steps,
            "journey": details.journey,
            "progress_percentage": details.progress.percentage,
            "completed_required": details.progress.completed_required,
            "total_required": details.progress.total_required,
            "next_available": details.next_available,
        }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct ImportPlaybookBody {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub items: Vec<PlaybookItem>,
}

/// POST /api/playbooks — import a playbook template.
pub async fn import_playbook(
    State(app): State<AppState>,
    Json(body): Json<ImportPlaybookBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut template = PlaybookTemplate::new(body.slug, body.name, body.items);
        template.description = body.description;
        template.category = body.category;

        let store = FileStore::new(root);
        let template = store.put_template(template)?;
        Ok::<_, playbook_core::PlaybookError>(serde_json::json!({
            "slug": template.slug,
            "steps": template.items.len(),
        }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
