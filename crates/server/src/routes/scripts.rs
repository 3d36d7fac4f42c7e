use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    project::Project,
    script::{CreateScript, Script, ScriptKind, ScriptSummary},
    script_import::ScriptImport,
};
use deployment::Deployment;
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// GET /api/projects/{project_id}/scripts
/// Script versions, newest first, without their text.
pub async fn get_scripts(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ScriptSummary>>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let scripts = Script::find_by_project(&deployment.db().pool, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(scripts)))
}

/// POST /api/projects/{project_id}/scripts
/// Stores a new script version without processing it.
pub async fn create_script(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateScript>,
) -> Result<ResponseJson<ApiResponse<Script>>, ApiError> {
    user.project(&deployment, project_id).await?;
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("script content is empty".to_string()));
    }

    let pool = &deployment.db().pool;
    let script = Script::create(pool, project_id, ScriptKind::Uploaded, &payload).await?;
    Project::touch(pool, project_id).await?;
    info!(
        project_id = %project_id,
        version = script.version,
        word_count = script.word_count,
        "Stored script"
    );
    Ok(ResponseJson(ApiResponse::success(script)))
}

/// POST /api/projects/{project_id}/script-import
/// Stores the script and derives premise, argument, storyline, beat sheet and
/// scenes from it in the background. Poll the GET route for progress.
pub async fn start_script_import(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateScript>,
) -> Result<ResponseJson<ApiResponse<ScriptImport>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let job = deployment
        .script_importer()
        .start(project_id, &payload, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

/// GET /api/projects/{project_id}/script-import
/// The most recent import job of the project.
pub async fn get_script_import(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ScriptImport>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let job = ScriptImport::find_latest_for_project(&deployment.db().pool, project_id)
        .await?
        .ok_or(ApiError::NotFound("script import"))?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/projects/{project_id}/scripts",
            get(get_scripts).post(create_script),
        )
        .route(
            "/projects/{project_id}/script-import",
            get(get_script_import).post(start_script_import),
        )
}
