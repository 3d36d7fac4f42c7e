use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Status of an uploaded-script processing run
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default)]
#[sqlx(type_name = "import_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImportStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// Background run deriving premise, argument, storyline and beat sheet from an uploaded script
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ScriptImport {
    pub id: Uuid,
    pub project_id: Uuid,
    pub script_id: Uuid,
    pub status: ImportStatus,
    pub current_stage: Option<String>, // Stage being generated, or the one that failed
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScriptImport {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        project_id: Uuid,
        script_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ScriptImport>(
            r#"INSERT INTO script_imports (id, project_id, script_id)
               VALUES ($1, $2, $3)
               RETURNING *"#,
        )
        .bind(id)
        .bind(project_id)
        .bind(script_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ScriptImport>("SELECT * FROM script_imports WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_latest_for_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ScriptImport>(
            r#"SELECT * FROM script_imports
               WHERE project_id = $1
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1"#,
        )
        .bind(project_id)
        .fetch_optional(pool)
        .await
    }

    /// Marks the run as running on `stage`.
    pub async fn update_progress(
        pool: &SqlitePool,
        id: Uuid,
        stage: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE script_imports
               SET status = 'running',
                   current_stage = $1,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $2"#,
        )
        .bind(stage)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: ImportStatus,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE script_imports
               SET status = $1,
                   error_message = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $3"#,
        )
        .bind(status)
        .bind(error_message)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
