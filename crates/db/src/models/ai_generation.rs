use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "generation_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationOutcome {
    Completed,
    Failed,
}

/// One call to the completion gateway, kept for usage tracking
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AiGeneration {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub generation_type: String,
    pub model_used: String,
    pub status: GenerationOutcome,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
    pub tokens_used: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecordGeneration<'a> {
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub generation_type: &'a str,
    pub model_used: &'a str,
    pub status: GenerationOutcome,
    pub error_message: Option<&'a str>,
    pub processing_time_ms: i64,
    pub tokens_used: Option<i64>,
}

impl AiGeneration {
    pub async fn record(pool: &SqlitePool, data: &RecordGeneration<'_>) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AiGeneration>(
            r#"INSERT INTO ai_generations (
                   id, project_id, user_id, generation_type, model_used, status,
                   error_message, processing_time_ms, tokens_used
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.generation_type)
        .bind(data.model_used)
        .bind(data.status)
        .bind(data.error_message)
        .bind(data.processing_time_ms)
        .bind(data.tokens_used)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_project(
        pool: &SqlitePool,
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AiGeneration>(
            r#"SELECT * FROM ai_generations
               WHERE project_id = $1
               ORDER BY created_at DESC, rowid DESC
               LIMIT $2"#,
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
