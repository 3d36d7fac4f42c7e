//! Bearer token authentication and project ownership checks.
//!
//! Resources that belong to another user are reported as missing, never as
//! forbidden.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use db::models::{
    budget_item::BudgetItem, project::Project, scene::Scene, shot::Shot, storyboard::Storyboard,
};
use deployment::Deployment;
use secrecy::ExposeSecret;
use utils::jwt::decode_token;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// The caller, taken from the `sub` claim of a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl FromRequestParts<DeploymentImpl> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))?;

        let claims = decode_token(token, deployment.config().jwt_secret.expose_secret())?;
        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Reports a parent that is missing or not owned as the child itself.
fn missing_as(err: ApiError, what: &'static str) -> ApiError {
    match err {
        ApiError::NotFound(_) => ApiError::NotFound(what),
        other => other,
    }
}

impl AuthUser {
    pub async fn project(
        &self,
        deployment: &DeploymentImpl,
        project_id: Uuid,
    ) -> Result<Project, ApiError> {
        Project::find_for_user(&deployment.db().pool, project_id, self.user_id)
            .await?
            .ok_or(ApiError::NotFound("project"))
    }

    pub async fn scene(&self, deployment: &DeploymentImpl, scene_id: Uuid) -> Result<Scene, ApiError> {
        let scene = Scene::find_by_id(&deployment.db().pool, scene_id)
            .await?
            .ok_or(ApiError::NotFound("scene"))?;
        self.project(deployment, scene.project_id)
            .await
            .map_err(|e| missing_as(e, "scene"))?;
        Ok(scene)
    }

    pub async fn storyboard(
        &self,
        deployment: &DeploymentImpl,
        storyboard_id: Uuid,
    ) -> Result<Storyboard, ApiError> {
        let storyboard = Storyboard::find_by_id(&deployment.db().pool, storyboard_id)
            .await?
            .ok_or(ApiError::NotFound("storyboard"))?;
        self.scene(deployment, storyboard.scene_id)
            .await
            .map_err(|e| missing_as(e, "storyboard"))?;
        Ok(storyboard)
    }

    pub async fn shot(&self, deployment: &DeploymentImpl, shot_id: Uuid) -> Result<Shot, ApiError> {
        let shot = Shot::find_by_id(&deployment.db().pool, shot_id)
            .await?
            .ok_or(ApiError::NotFound("shot"))?;
        self.scene(deployment, shot.scene_id)
            .await
            .map_err(|e| missing_as(e, "shot"))?;
        Ok(shot)
    }

    pub async fn budget_item(
        &self,
        deployment: &DeploymentImpl,
        item_id: Uuid,
    ) -> Result<BudgetItem, ApiError> {
        let item = BudgetItem::find_by_id(&deployment.db().pool, item_id)
            .await?
            .ok_or(ApiError::NotFound("budget item"))?;
        self.project(deployment, item.project_id)
            .await
            .map_err(|e| missing_as(e, "budget item"))?;
        Ok(item)
    }
}
