use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::storyboard::{CreateStoryboard, Storyboard, UpdateStoryboard};
use deployment::Deployment;
use services::services::storyboard::ImageFrameRequest;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// GET /api/scenes/{scene_id}/storyboards
pub async fn get_storyboards(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Storyboard>>>, ApiError> {
    user.scene(&deployment, scene_id).await?;
    let frames = Storyboard::find_by_scene(&deployment.db().pool, scene_id).await?;
    Ok(ResponseJson(ApiResponse::success(frames)))
}

/// POST /api/scenes/{scene_id}/storyboards
pub async fn create_storyboard(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateStoryboard>,
) -> Result<ResponseJson<ApiResponse<Storyboard>>, ApiError> {
    user.scene(&deployment, scene_id).await?;
    let frame = Storyboard::create(&deployment.db().pool, scene_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(frame)))
}

/// POST /api/scenes/{scene_id}/storyboards/generate
/// Adds AI-written frames after the scene's existing ones.
pub async fn generate_storyboards(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Storyboard>>>, ApiError> {
    let scene = user.scene(&deployment, scene_id).await?;
    let frames = deployment
        .storyboards()
        .generate_frames_for_scene(&scene, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(frames)))
}

/// POST /api/scenes/{scene_id}/storyboards/image
pub async fn generate_storyboard_image(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(scene_id): Path<Uuid>,
    axum::Json(payload): axum::Json<ImageFrameRequest>,
) -> Result<ResponseJson<ApiResponse<Storyboard>>, ApiError> {
    let scene = user.scene(&deployment, scene_id).await?;
    let frame = deployment
        .storyboards()
        .generate_frame_image(&scene, &payload, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(frame)))
}

/// PUT /api/storyboards/{storyboard_id}
pub async fn update_storyboard(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(storyboard_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateStoryboard>,
) -> Result<ResponseJson<ApiResponse<Storyboard>>, ApiError> {
    user.storyboard(&deployment, storyboard_id).await?;
    let frame = Storyboard::update(&deployment.db().pool, storyboard_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(frame)))
}

/// DELETE /api/storyboards/{storyboard_id}
pub async fn delete_storyboard(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(storyboard_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.storyboard(&deployment, storyboard_id).await?;
    Storyboard::delete(&deployment.db().pool, storyboard_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/scenes/{scene_id}/storyboards",
            get(get_storyboards).post(create_storyboard),
        )
        .route(
            "/scenes/{scene_id}/storyboards/generate",
            post(generate_storyboards),
        )
        .route(
            "/scenes/{scene_id}/storyboards/image",
            post(generate_storyboard_image),
        )
        .route(
            "/storyboards/{storyboard_id}",
            put(update_storyboard).delete(delete_storyboard),
        )
}
