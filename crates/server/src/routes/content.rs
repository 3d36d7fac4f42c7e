use std::{collections::BTreeMap, str::FromStr};

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    project::Project,
    project_content::{ContentType, ProjectContent},
};
use deployment::Deployment;
use serde_json::Value;
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

pub(crate) fn parse_content_type(raw: &str) -> Result<ContentType, ApiError> {
    ContentType::from_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("unknown content type: {raw}")))
}

/// GET /api/projects/{project_id}/content
/// Every stored stage keyed by content type.
pub async fn get_content_map(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<BTreeMap<ContentType, Value>>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let rows = ProjectContent::find_by_project(&deployment.db().pool, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(ProjectContent::into_map(
        rows,
    ))))
}

/// GET /api/projects/{project_id}/content/{content_type}
pub async fn get_content(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path((project_id, content_type)): Path<(Uuid, String)>,
) -> Result<ResponseJson<ApiResponse<ProjectContent>>, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    user.project(&deployment, project_id).await?;

    let content = ProjectContent::find(&deployment.db().pool, project_id, content_type)
        .await?
        .ok_or(ApiError::NotFound("content"))?;
    Ok(ResponseJson(ApiResponse::success(content)))
}

/// PUT /api/projects/{project_id}/content/{content_type}
/// Stores a manually edited stage; any JSON value is accepted.
pub async fn upsert_content(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path((project_id, content_type)): Path<(Uuid, String)>,
    axum::Json(payload): axum::Json<Value>,
) -> Result<ResponseJson<ApiResponse<ProjectContent>>, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    user.project(&deployment, project_id).await?;

    let pool = &deployment.db().pool;
    let content = ProjectContent::upsert(pool, project_id, content_type, &payload).await?;
    Project::touch(pool, project_id).await?;
    info!(project_id = %project_id, content_type = %content_type, "Saved project content");
    Ok(ResponseJson(ApiResponse::success(content)))
}

/// DELETE /api/projects/{project_id}/content/{content_type}
pub async fn delete_content(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path((project_id, content_type)): Path<(Uuid, String)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    user.project(&deployment, project_id).await?;

    let deleted = ProjectContent::delete(&deployment.db().pool, project_id, content_type).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("content"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/projects/{project_id}/content", get(get_content_map))
        .route(
            "/projects/{project_id}/content/{content_type}",
            get(get_content).put(upsert_content).delete(delete_content),
        )
}
