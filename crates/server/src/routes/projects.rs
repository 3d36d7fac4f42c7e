use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    project::{CreateProject, Project, UpdateProject},
    project_content::{ContentType, ProjectContent},
};
use deployment::Deployment;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

/// A project with every stored stage, as shown on the project page.
#[derive(Debug, Clone, Serialize, TS)]
pub struct ProjectOverview {
    pub project: Project,
    #[ts(type = "Record<string, unknown>")]
    pub content: BTreeMap<ContentType, Value>,
    pub completed_stages: Vec<ContentType>,
}

fn required(field: &str, value: Option<&str>) -> Result<(), ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(ApiError::BadRequest(format!("{field} is required"))),
    }
}

/// GET /api/projects
/// Lists the caller's projects, most recently updated first.
pub async fn get_projects(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_by_user(&deployment.db().pool, user.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

/// POST /api/projects
pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    required("title", Some(payload.title.as_str()))?;
    required("genre", payload.genre.as_deref())?;
    required("format", payload.format.as_deref())?;

    let project = Project::create(
        &deployment.db().pool,
        Uuid::new_v4(),
        user.user_id,
        &payload,
    )
    .await?;
    info!(project_id = %project.id, user_id = %user.user_id, "Created project");
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// GET /api/projects/{project_id}
pub async fn get_project(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectOverview>>, ApiError> {
    let project = user.project(&deployment, project_id).await?;
    let rows = ProjectContent::find_by_project(&deployment.db().pool, project.id).await?;
    let completed_stages = ProjectContent::completed_stages(&rows);

    Ok(ResponseJson(ApiResponse::success(ProjectOverview {
        project,
        content: ProjectContent::into_map(rows),
        completed_stages,
    })))
}

/// PUT /api/projects/{project_id}
pub async fn update_project(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    user.project(&deployment, project_id).await?;
    if payload.title.is_some() {
        required("title", payload.title.as_deref())?;
    }

    let project = Project::update(&deployment.db().pool, project_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// DELETE /api/projects/{project_id}
/// Removes the project with its content, scenes, scripts and budget.
pub async fn delete_project(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.project(&deployment, project_id).await?;
    Project::delete(&deployment.db().pool, project_id).await?;
    info!(project_id = %project_id, "Deleted project");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/projects", get(get_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project).put(update_project).delete(delete_project),
        )
}
