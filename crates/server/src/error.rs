use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    ai_gateway::AiGatewayError, breakdown::BreakdownError, budget::BudgetError,
    content_generator::GenerationError, scene_sync::SceneSyncError,
    script_import::ScriptImportError, stages::StageError, storyboard::StoryboardError,
};
use thiserror::Error;
use utils::{jwt::JwtError, response::ApiResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    SceneSync(#[from] SceneSyncError),
    #[error(transparent)]
    Breakdown(#[from] BreakdownError),
    #[error(transparent)]
    Storyboard(#[from] StoryboardError),
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error(transparent)]
    ScriptImport(#[from] ScriptImportError),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

fn gateway_status(err: &AiGatewayError) -> StatusCode {
    match err {
        AiGatewayError::CreditsExhausted => StatusCode::PAYMENT_REQUIRED,
        AiGatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        AiGatewayError::EmptyResponse | AiGatewayError::NoImage | AiGatewayError::Serde(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn generation_status(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::InvalidKind(_) | GenerationError::MissingContext(_) => {
            StatusCode::BAD_REQUEST
        }
        GenerationError::Gateway(e) => gateway_status(e),
        GenerationError::Unparsable(_) => StatusCode::BAD_GATEWAY,
    }
}

fn database_status(err: &sqlx::Error) -> StatusCode {
    match err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(e) => database_status(e),
            ApiError::Generation(e) => generation_status(e),
            ApiError::Stage(e) => match e {
                StageError::Database(e) => database_status(e),
                StageError::Generation(e) => generation_status(e),
                StageError::MissingPrerequisite { .. } => StatusCode::CONFLICT,
                StageError::UnsupportedStage(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::SceneSync(e) => match e {
                SceneSyncError::Database(e) => database_status(e),
                SceneSyncError::MissingBeatSheet => StatusCode::CONFLICT,
            },
            ApiError::Breakdown(e) => match e {
                BreakdownError::Database(e) => database_status(e),
                BreakdownError::Generation(e) => generation_status(e),
                BreakdownError::NoScenes => StatusCode::CONFLICT,
            },
            ApiError::Storyboard(e) => match e {
                StoryboardError::Database(e) => database_status(e),
                StoryboardError::Generation(e) => generation_status(e),
                StoryboardError::NoScenes => StatusCode::CONFLICT,
            },
            ApiError::Budget(e) => match e {
                BudgetError::Database(e) => database_status(e),
                BudgetError::Generation(e) => generation_status(e),
            },
            ApiError::ScriptImport(e) => match e {
                ScriptImportError::Database(e) => database_status(e),
                ScriptImportError::Generation(e) => generation_status(e),
                ScriptImportError::SceneSync(SceneSyncError::MissingBeatSheet) => {
                    StatusCode::CONFLICT
                }
                ScriptImportError::SceneSync(SceneSyncError::Database(e)) => database_status(e),
                ScriptImportError::EmptyScript => StatusCode::BAD_REQUEST,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn database_source(&self) -> Option<&sqlx::Error> {
        match self {
            ApiError::Database(e)
            | ApiError::Stage(StageError::Database(e))
            | ApiError::SceneSync(SceneSyncError::Database(e))
            | ApiError::Breakdown(BreakdownError::Database(e))
            | ApiError::Storyboard(StoryboardError::Database(e))
            | ApiError::Budget(BudgetError::Database(e))
            | ApiError::ScriptImport(ScriptImportError::Database(e))
            | ApiError::ScriptImport(ScriptImportError::SceneSync(SceneSyncError::Database(e))) => {
                Some(e)
            }
            _ => None,
        }
    }

    /// Text sent to the client; internal details of database failures stay in the logs.
    fn client_message(&self) -> String {
        match self.database_source() {
            Some(_) if self.status_code().is_server_error() => "database error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let message = self.client_message();
        (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use db::models::project_content::ContentType;

    use super::*;

    #[test]
    fn gateway_failures_map_to_client_visible_statuses() {
        let credits: ApiError = GenerationError::Gateway(AiGatewayError::CreditsExhausted).into();
        assert_eq!(credits.status_code(), StatusCode::PAYMENT_REQUIRED);

        let limited: ApiError = BudgetError::Generation(GenerationError::Gateway(
            AiGatewayError::RateLimited,
        ))
        .into();
        assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let garbled: ApiError = GenerationError::Unparsable("no JSON".to_string()).into();
        assert_eq!(garbled.status_code(), StatusCode::BAD_GATEWAY);

        let upstream: ApiError = GenerationError::Gateway(AiGatewayError::Http {
            status: 503,
            body: String::new(),
        })
        .into();
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn pipeline_order_violations_are_conflicts() {
        let missing: ApiError = StageError::MissingPrerequisite {
            stage: ContentType::Script,
            missing: ContentType::BeatSheet,
        }
        .into();
        assert_eq!(missing.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(BreakdownError::NoScenes).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(SceneSyncError::MissingBeatSheet).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn database_failures_hide_their_details() {
        let errors: Vec<ApiError> = vec![
            sqlx::Error::PoolTimedOut.into(),
            StageError::Database(sqlx::Error::PoolTimedOut).into(),
            BudgetError::Database(sqlx::Error::PoolClosed).into(),
            ScriptImportError::SceneSync(SceneSyncError::Database(sqlx::Error::PoolClosed)).into(),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.client_message(), "database error");
        }

        let missing: ApiError = StageError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.client_message(), missing.to_string());
    }
}
