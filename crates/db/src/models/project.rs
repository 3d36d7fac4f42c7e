use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid, // Owner, the `sub` of the caller's token
    pub title: String,
    pub genre: Option<String>,
    pub format: Option<String>, // Feature, short, series episode...
    pub status: ProjectStatus,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    pub title: String,
    pub genre: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub format: Option<String>,
    pub status: Option<ProjectStatus>,
    pub thumbnail_url: Option<String>,
}

impl Project {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &CreateProject,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"INSERT INTO projects (id, user_id, title, genre, format)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&data.title)
        .bind(&data.genre)
        .bind(&data.format)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a project only if it belongs to `user_id`.
    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"SELECT * FROM projects
               WHERE user_id = $1
               ORDER BY updated_at DESC, rowid DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"UPDATE projects
               SET title = COALESCE($1, title),
                   genre = COALESCE($2, genre),
                   format = COALESCE($3, format),
                   status = COALESCE($4, status),
                   thumbnail_url = COALESCE($5, thumbnail_url),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $6
               RETURNING *"#,
        )
        .bind(&data.title)
        .bind(&data.genre)
        .bind(&data.format)
        .bind(&data.status)
        .bind(&data.thumbnail_url)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Bumps `updated_at` so the project floats to the top of the dashboard.
    pub async fn touch(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET updated_at = datetime('now', 'subsec') WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn sample(title: &str) -> CreateProject {
        CreateProject {
            title: title.to_string(),
            genre: Some("Drama".to_string()),
            format: Some("Short".to_string()),
        }
    }

    #[tokio::test]
    async fn find_for_user_enforces_ownership() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let project = Project::create(&db.pool, Uuid::new_v4(), owner, &sample("Mar Aberto"))
            .await
            .unwrap();

        assert_eq!(project.status, ProjectStatus::Draft);
        assert!(
            Project::find_for_user(&db.pool, project.id, owner)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            Project::find_for_user(&db.pool, project.id, Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = Project::create(&db.pool, Uuid::new_v4(), Uuid::new_v4(), &sample("Old"))
            .await
            .unwrap();

        let updated = Project::update(
            &db.pool,
            project.id,
            &UpdateProject {
                title: Some("New".to_string()),
                status: Some(ProjectStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.status, ProjectStatus::InProgress);
        assert_eq!(updated.genre.as_deref(), Some("Drama"));
    }

    #[tokio::test]
    async fn lists_most_recently_touched_first() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let first = Project::create(&db.pool, Uuid::new_v4(), owner, &sample("First"))
            .await
            .unwrap();
        let _second = Project::create(&db.pool, Uuid::new_v4(), owner, &sample("Second"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        Project::touch(&db.pool, first.id).await.unwrap();

        let projects = Project::find_by_user(&db.pool, owner).await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].title, "First");
    }
}
