use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::shot::{CreateShot, Shot, UpdateShot};
use deployment::Deployment;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// GET /api/scenes/{scene_id}/shots
pub async fn get_scene_shots(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Shot>>>, ApiError> {
    user.scene(&deployment, scene_id).await?;
    let shots = Shot::find_by_scene(&deployment.db().pool, scene_id).await?;
    Ok(ResponseJson(ApiResponse::success(shots)))
}

/// POST /api/scenes/{scene_id}/shots
pub async fn create_shot(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateShot>,
) -> Result<ResponseJson<ApiResponse<Shot>>, ApiError> {
    user.scene(&deployment, scene_id).await?;
    let shot = Shot::create(&deployment.db().pool, scene_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(shot)))
}

/// POST /api/scenes/{scene_id}/shots/generate
/// Technical breakdown of one scene, appended to its shot list.
pub async fn generate_scene_shots(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Shot>>>, ApiError> {
    let scene = user.scene(&deployment, scene_id).await?;
    let shots = deployment
        .breakdown()
        .generate_for_scene(&scene, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(shots)))
}

/// GET /api/projects/{project_id}/shots
/// Shots of every scene, in scene order.
pub async fn get_project_shots(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Shot>>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let shots = Shot::find_by_project(&deployment.db().pool, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(shots)))
}

/// PUT /api/shots/{shot_id}
pub async fn update_shot(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(shot_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateShot>,
) -> Result<ResponseJson<ApiResponse<Shot>>, ApiError> {
    user.shot(&deployment, shot_id).await?;
    let shot = Shot::update(&deployment.db().pool, shot_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(shot)))
}

/// DELETE /api/shots/{shot_id}
pub async fn delete_shot(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(shot_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.shot(&deployment, shot_id).await?;
    Shot::delete(&deployment.db().pool, shot_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/scenes/{scene_id}/shots",
            get(get_scene_shots).post(create_shot),
        )
        .route("/scenes/{scene_id}/shots/generate", post(generate_scene_shots))
        .route("/projects/{project_id}/shots", get(get_project_shots))
        .route("/shots/{shot_id}", put(update_shot).delete(delete_shot))
}
