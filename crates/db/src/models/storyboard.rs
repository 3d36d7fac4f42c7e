use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// One storyboard frame of a scene.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Storyboard {
    pub id: Uuid,
    pub scene_id: Uuid,
    pub frame_number: i64,
    pub description: Option<String>,
    pub camera_angle: Option<String>,
    pub camera_movement: Option<String>,
    pub image_prompt: Option<String>,
    pub image_url: Option<String>, // May be a data: URL straight from the image model
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateStoryboard {
    pub frame_number: Option<i64>,
    pub description: Option<String>,
    pub camera_angle: Option<String>,
    pub camera_movement: Option<String>,
    pub image_prompt: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateStoryboard {
    pub frame_number: Option<i64>,
    pub description: Option<String>,
    pub camera_angle: Option<String>,
    pub camera_movement: Option<String>,
    pub image_prompt: Option<String>,
    pub image_url: Option<String>,
}

impl Storyboard {
    /// Inserts a frame; without an explicit number it goes after the last one.
    pub async fn create<'e, E>(
        executor: E,
        scene_id: Uuid,
        data: &CreateStoryboard,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Storyboard>(
            r#"INSERT INTO storyboards (
                   id, scene_id, frame_number, description, camera_angle,
                   camera_movement, image_prompt, image_url
               )
               VALUES (
                   $1, $2,
                   COALESCE($3, (SELECT COALESCE(MAX(frame_number), 0) + 1
                                 FROM storyboards WHERE scene_id = $2)),
                   $4, $5, $6, $7, $8
               )
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(scene_id)
        .bind(data.frame_number)
        .bind(&data.description)
        .bind(&data.camera_angle)
        .bind(&data.camera_movement)
        .bind(&data.image_prompt)
        .bind(&data.image_url)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Storyboard>("SELECT * FROM storyboards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_scene(
        pool: &SqlitePool,
        scene_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Storyboard>(
            "SELECT * FROM storyboards WHERE scene_id = $1 ORDER BY frame_number, rowid",
        )
        .bind(scene_id)
        .fetch_all(pool)
        .await
    }

    pub async fn next_frame_number<'e, E>(executor: E, scene_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(frame_number), 0) + 1 FROM storyboards WHERE scene_id = $1",
        )
        .bind(scene_id)
        .fetch_one(executor)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateStoryboard,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Storyboard>(
            r#"UPDATE storyboards
               SET frame_number = COALESCE($1, frame_number),
                   description = COALESCE($2, description),
                   camera_angle = COALESCE($3, camera_angle),
                   camera_movement = COALESCE($4, camera_movement),
                   image_prompt = COALESCE($5, image_prompt),
                   image_url = COALESCE($6, image_url)
               WHERE id = $7
               RETURNING *"#,
        )
        .bind(data.frame_number)
        .bind(&data.description)
        .bind(&data.camera_angle)
        .bind(&data.camera_movement)
        .bind(&data.image_prompt)
        .bind(&data.image_url)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM storyboards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
