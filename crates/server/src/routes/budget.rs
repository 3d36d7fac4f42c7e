use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::budget_item::{BudgetItem, CreateBudgetItem, UpdateBudgetItem};
use deployment::Deployment;
use serde::Serialize;
use services::services::budget::{BudgetSummary, summarize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, auth::AuthUser, error::ApiError};

#[derive(Debug, Clone, Serialize, TS)]
pub struct ProjectBudget {
    pub items: Vec<BudgetItem>,
    pub summary: BudgetSummary,
}

fn check_amounts(quantity: Option<f64>, unit_price: Option<f64>) -> Result<(), ApiError> {
    for (field, value) in [("quantity", quantity), ("unit_price", unit_price)] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(ApiError::BadRequest(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }
    }
    Ok(())
}

/// GET /api/projects/{project_id}/budget
/// Items with per-category subtotals and the grand total.
pub async fn get_budget(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectBudget>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let items = BudgetItem::find_by_project(&deployment.db().pool, project_id).await?;
    let summary = summarize(&items, &deployment.config().budget_currency);
    Ok(ResponseJson(ApiResponse::success(ProjectBudget {
        items,
        summary,
    })))
}

/// POST /api/projects/{project_id}/budget
pub async fn create_budget_item(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateBudgetItem>,
) -> Result<ResponseJson<ApiResponse<BudgetItem>>, ApiError> {
    user.project(&deployment, project_id).await?;
    if payload.item_name.trim().is_empty() {
        return Err(ApiError::BadRequest("item_name is required".to_string()));
    }
    check_amounts(payload.quantity, payload.unit_price)?;

    let item = BudgetItem::create(
        &deployment.db().pool,
        project_id,
        &payload,
        &deployment.config().budget_currency,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(item)))
}

/// POST /api/projects/{project_id}/budget/generate
/// Adds an AI-estimated budget to the project's items.
pub async fn generate_budget(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<BudgetItem>>>, ApiError> {
    user.project(&deployment, project_id).await?;
    let items = deployment
        .budget()
        .generate_for_project(project_id, Some(user.user_id))
        .await?;
    Ok(ResponseJson(ApiResponse::success(items)))
}

/// PUT /api/budget-items/{item_id}
pub async fn update_budget_item(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateBudgetItem>,
) -> Result<ResponseJson<ApiResponse<BudgetItem>>, ApiError> {
    user.budget_item(&deployment, item_id).await?;
    if payload
        .item_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(ApiError::BadRequest("item_name cannot be empty".to_string()));
    }
    check_amounts(payload.quantity, payload.unit_price)?;

    let item = BudgetItem::update(&deployment.db().pool, item_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(item)))
}

/// DELETE /api/budget-items/{item_id}
pub async fn delete_budget_item(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.budget_item(&deployment, item_id).await?;
    BudgetItem::delete(&deployment.db().pool, item_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/projects/{project_id}/budget",
            get(get_budget).post(create_budget_item),
        )
        .route("/projects/{project_id}/budget/generate", post(generate_budget))
        .route(
            "/budget-items/{item_id}",
            put(update_budget_item).delete(delete_budget_item),
        )
}
