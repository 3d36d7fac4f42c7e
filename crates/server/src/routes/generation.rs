use std::time::Instant;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::ai_generation::AiGeneration;
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    content_generator::{
        BulkReport, GenerationContext, GenerationKind, LogScope, log_generation,
    },
    stages::GeneratedStage,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::content::parse_content_type;
use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 200;

#[derive(Debug, Deserialize, TS)]
pub struct GenerateRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub context: GenerationContext,
}

#[derive(Debug, Serialize, TS)]
pub struct GenerateResponse {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerationLogQuery {
    pub limit: Option<i64>,
}

/// POST /api/generate
/// Stateless generation: the raw model answer for `type`, nothing is stored
/// apart from the generation log row.
pub async fn generate(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    axum::Json(payload): axum::Json<GenerateRequest>,
) -> Result<ResponseJson<ApiResponse<GenerateResponse>>, ApiError> {
    let kind = GenerationKind::parse(&payload.kind)?;
    let generator = deployment.generator();
    let from_script = payload
        .context
        .script
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    let model = generator.model_for(kind, from_script).to_string();

    let started = Instant::now();
    let result = generator.generate(kind, &payload.context).await;
    let scope = LogScope {
        project_id: None,
        user_id: Some(user.user_id),
    };
    log_generation(
        &deployment.db().pool,
        scope,
        &kind.to_string(),
        &model,
        started,
        result.as_ref(),
    )
    .await;

    Ok(ResponseJson(ApiResponse::success(GenerateResponse {
        content: result?.content,
    })))
}

/// POST /api/projects/{project_id}/generate/{stage}
/// Generates one pipeline stage from what the project already has and stores it.
pub async fn generate_stage(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path((project_id, stage)): Path<(Uuid, String)>,
) -> Result<ResponseJson<ApiResponse<GeneratedStage>>, ApiError> {
    let stage = parse_content_type(&stage)?;
    user.project(&deployment, project_id).await?;

    let generated = deployment
        .stages()
        .generate_stage(project_id, stage, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(generated)))
}

/// POST /api/projects/{project_id}/breakdown/generate
/// Technical breakdown of every scene; failing scenes are listed in the report.
pub async fn generate_project_breakdown(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<BulkReport>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let report = deployment
        .breakdown()
        .generate_for_project(project_id, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// POST /api/projects/{project_id}/storyboards/generate
pub async fn generate_project_storyboards(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<BulkReport>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let report = deployment
        .storyboards()
        .generate_for_project(project_id, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// GET /api/projects/{project_id}/generations?limit=
pub async fn get_generations(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    Query(query): Query<GenerationLogQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AiGeneration>>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);
    let log = AiGeneration::find_by_project(&deployment.db().pool, project_id, limit).await?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/generate", post(generate))
        .route("/projects/{project_id}/generate/{stage}", post(generate_stage))
        .route(
            "/projects/{project_id}/breakdown/generate",
            post(generate_project_breakdown),
        )
        .route(
            "/projects/{project_id}/storyboards/generate",
            post(generate_project_storyboards),
        )
        .route("/projects/{project_id}/generations", get(get_generations))
}
