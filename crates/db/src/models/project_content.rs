use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool, Type, types::Json};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Pipeline stage a content blob belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TS,
    EnumString,
    Display,
)]
#[sqlx(type_name = "content_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentType {
    Premise,
    Argument,
    Storyline,
    BeatSheet,
    Script,
    Storyboard,
    Breakdown,
    Budget,
}

/// Loosely typed per-stage blob, unique per `(project_id, content_type)`.
///
/// Shapes written by the generators: `{text}` for premise, argument and
/// script, `{acts: {act1, act2, act3}}` for the storyline and `{scenes: [...]}`
/// for the beat sheet. Manual edits may store anything.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProjectContent {
    pub id: Uuid,
    pub project_id: Uuid,
    pub content_type: ContentType,
    #[ts(type = "unknown")]
    pub content: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectContent {
    pub fn text(&self) -> Option<&str> {
        self.content.get("text").and_then(Value::as_str)
    }

    /// True when the blob holds something a later stage can build on.
    pub fn is_filled(&self) -> bool {
        let content = &self.content.0;
        let has_text = content
            .get("text")
            .and_then(Value::as_str)
            .is_some_and(|t| !t.trim().is_empty());
        let has_scenes = content
            .get("scenes")
            .and_then(Value::as_array)
            .is_some_and(|s| !s.is_empty());
        let has_acts = content.get("acts").is_some_and(|a| !a.is_null());
        has_text || has_scenes || has_acts
    }

    /// Stages with usable content, in pipeline order.
    pub fn completed_stages(rows: &[ProjectContent]) -> Vec<ContentType> {
        let mut stages: Vec<ContentType> = rows
            .iter()
            .filter(|row| row.is_filled())
            .map(|row| row.content_type)
            .collect();
        stages.sort();
        stages
    }

    pub fn into_map(rows: Vec<ProjectContent>) -> BTreeMap<ContentType, Value> {
        rows.into_iter()
            .map(|row| (row.content_type, row.content.0))
            .collect()
    }

    pub async fn upsert(
        pool: &SqlitePool,
        project_id: Uuid,
        content_type: ContentType,
        content: &Value,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProjectContent>(
            r#"INSERT INTO project_content (id, project_id, content_type, content)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT(project_id, content_type) DO UPDATE SET
                   content = excluded.content,
                   updated_at = datetime('now', 'subsec')
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(content_type)
        .bind(Json(content))
        .fetch_one(pool)
        .await
    }

    pub async fn find(
        pool: &SqlitePool,
        project_id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectContent>(
            "SELECT * FROM project_content WHERE project_id = $1 AND content_type = $2",
        )
        .bind(project_id)
        .bind(content_type)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectContent>(
            "SELECT * FROM project_content WHERE project_id = $1 ORDER BY content_type",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(
        pool: &SqlitePool,
        project_id: Uuid,
        content_type: ContentType,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM project_content WHERE project_id = $1 AND content_type = $2",
        )
        .bind(project_id)
        .bind(content_type)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
