use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "script_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScriptKind {
    Uploaded,
    Generated,
}

/// A versioned full screenplay text.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Script {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: ScriptKind,
    pub content: String,
    pub file_name: Option<String>,
    pub word_count: i64,
    pub version: i64, // 1-based, per project
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateScript {
    pub content: String,
    pub file_name: Option<String>,
}

/// Listing entry without the (possibly large) text.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ScriptSummary {
    pub id: Uuid,
    pub kind: ScriptKind,
    pub file_name: Option<String>,
    pub word_count: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Script {
    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        kind: ScriptKind,
        data: &CreateScript,
    ) -> Result<Self, sqlx::Error> {
        let word_count = utils::text::word_count(&data.content) as i64;
        sqlx::query_as::<_, Script>(
            r#"INSERT INTO scripts (id, project_id, kind, content, file_name, word_count, version)
               VALUES (
                   $1, $2, $3, $4, $5, $6,
                   (SELECT COALESCE(MAX(version), 0) + 1 FROM scripts WHERE project_id = $2)
               )
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(kind)
        .bind(&data.content)
        .bind(&data.file_name)
        .bind(word_count)
        .fetch_one(pool)
        .await
    }

    pub async fn latest_for_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Script>(
            r#"SELECT * FROM scripts
               WHERE project_id = $1
               ORDER BY version DESC
               LIMIT 1"#,
        )
        .bind(project_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<ScriptSummary>, sqlx::Error> {
        sqlx::query_as::<_, ScriptSummary>(
            r#"SELECT id, kind, file_name, word_count, version, created_at
               FROM scripts
               WHERE project_id = $1
               ORDER BY version DESC"#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::project::{CreateProject, Project},
    };

    #[tokio::test]
    async fn versions_increase_per_project() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = Project::create(
            &db.pool,
            Uuid::new_v4(),
            Uuid::new_v4(),
            &CreateProject {
                title: "Roteiro".to_string(),
                genre: None,
                format: None,
            },
        )
        .await
        .unwrap();

        let first = Script::create(
            &db.pool,
            project.id,
            ScriptKind::Uploaded,
            &CreateScript {
                content: "INT. HOUSE - DAY".to_string(),
                file_name: Some("draft.pdf".to_string()),
            },
        )
        .await
        .unwrap();
        let second = Script::create(
            &db.pool,
            project.id,
            ScriptKind::Generated,
            &CreateScript {
                content: "EXT. STREET - NIGHT\nAna runs.".to_string(),
                file_name: None,
            },
        )
        .await
        .unwrap();

        assert_eq!((first.version, second.version), (1, 2));
        assert_eq!(first.word_count, 4);
        let latest = Script::latest_for_project(&db.pool, project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(
            Script::find_by_project(&db.pool, project.id).await.unwrap()[0].version,
            2
        );
    }
}
