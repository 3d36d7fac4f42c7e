use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::scene::{CreateScene, Scene, UpdateScene};
use deployment::Deployment;
use services::services::scene_sync::{SyncReport, sync_scenes_from_beat_sheet};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

fn check_scene_number(number: Option<i64>) -> Result<(), ApiError> {
    match number {
        Some(n) if n < 1 => Err(ApiError::BadRequest(
            "scene_number must be positive".to_string(),
        )),
        _ => Ok(()),
    }
}

/// GET /api/projects/{project_id}/scenes
pub async fn get_scenes(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Scene>>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let scenes = Scene::find_by_project(&deployment.db().pool, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(scenes)))
}

/// POST /api/projects/{project_id}/scenes
pub async fn create_scene(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateScene>,
) -> Result<ResponseJson<ApiResponse<Scene>>, ApiError> {
    user.project(&deployment, project_id).await?;
    check_scene_number(Some(payload.scene_number))?;

    let scene = Scene::create(&deployment.db().pool, project_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(scene)))
}

/// POST /api/projects/{project_id}/scenes/sync
/// Rebuilds the scene list from the stored beat sheet.
pub async fn sync_scenes(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SyncReport>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let report = sync_scenes_from_beat_sheet(&deployment.db().pool, project_id).await?;
    info!(
        project_id = %project_id,
        created = report.created,
        updated = report.updated,
        deleted = report.deleted,
        "Synced scenes from beat sheet"
    );
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// PUT /api/scenes/{scene_id}
pub async fn update_scene(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateScene>,
) -> Result<ResponseJson<ApiResponse<Scene>>, ApiError> {
    user.scene(&deployment, scene_id).await?;
    check_scene_number(payload.scene_number)?;

    let scene = Scene::update(&deployment.db().pool, scene_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(scene)))
}

/// DELETE /api/scenes/{scene_id}
/// Also removes the scene's storyboards and shots.
pub async fn delete_scene(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.scene(&deployment, scene_id).await?;
    Scene::delete(&deployment.db().pool, scene_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/projects/{project_id}/scenes",
            get(get_scenes).post(create_scene),
        )
        .route("/projects/{project_id}/scenes/sync", post(sync_scenes))
        .route("/scenes/{scene_id}", put(update_scene).delete(delete_scene))
}
