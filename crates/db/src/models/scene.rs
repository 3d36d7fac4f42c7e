use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// A structured scene row, usually derived from the beat sheet.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Scene {
    pub id: Uuid,
    pub project_id: Uuid,
    pub scene_number: i64,
    pub order_position: i64,
    pub int_ext: Option<String>,     // INT / EXT
    pub location: Option<String>,
    pub time_of_day: Option<String>, // DAY, NIGHT, DUSK, DAWN
    pub description: Option<String>,
    #[ts(type = "Array<string>")]
    pub characters: Json<Vec<String>>,
    pub estimated_duration: Option<i64>, // minutes
    pub notes: Option<String>,
    #[ts(type = "Array<string>")]
    pub props: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateScene {
    pub scene_number: i64,
    pub order_position: Option<i64>,
    pub int_ext: Option<String>,
    pub location: Option<String>,
    pub time_of_day: Option<String>,
    pub description: Option<String>,
    pub characters: Option<Vec<String>>,
    pub estimated_duration: Option<i64>,
    pub notes: Option<String>,
    pub props: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateScene {
    pub scene_number: Option<i64>,
    pub order_position: Option<i64>,
    pub int_ext: Option<String>,
    pub location: Option<String>,
    pub time_of_day: Option<String>,
    pub description: Option<String>,
    pub characters: Option<Vec<String>>,
    pub estimated_duration: Option<i64>,
    pub notes: Option<String>,
    pub props: Option<Vec<String>>,
}

impl Scene {
    /// Inserts a scene; `order_position` defaults to the end of the list.
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        data: &CreateScene,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Scene>(
            r#"INSERT INTO scenes (
                   id, project_id, scene_number, order_position, int_ext, location,
                   time_of_day, description, characters, estimated_duration, notes, props
               )
               VALUES (
                   $1, $2, $3,
                   COALESCE($4, (SELECT COUNT(*) FROM scenes WHERE project_id = $2)),
                   $5, $6, $7, $8, $9, $10, $11, $12
               )
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(data.scene_number)
        .bind(data.order_position)
        .bind(&data.int_ext)
        .bind(&data.location)
        .bind(&data.time_of_day)
        .bind(&data.description)
        .bind(Json(data.characters.clone().unwrap_or_default()))
        .bind(data.estimated_duration)
        .bind(&data.notes)
        .bind(Json(data.props.clone().unwrap_or_default()))
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Scene>("SELECT * FROM scenes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Scene>(
            r#"SELECT * FROM scenes
               WHERE project_id = $1
               ORDER BY scene_number ASC, order_position ASC"#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    pub async fn count_by_project(pool: &SqlitePool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scenes WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateScene,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Scene>(
            r#"UPDATE scenes
               SET scene_number = COALESCE($1, scene_number),
                   order_position = COALESCE($2, order_position),
                   int_ext = COALESCE($3, int_ext),
                   location = COALESCE($4, location),
                   time_of_day = COALESCE($5, time_of_day),
                   description = COALESCE($6, description),
                   characters = COALESCE($7, characters),
                   estimated_duration = COALESCE($8, estimated_duration),
                   notes = COALESCE($9, notes),
                   props = COALESCE($10, props),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $11
               RETURNING *"#,
        )
        .bind(data.scene_number)
        .bind(data.order_position)
        .bind(&data.int_ext)
        .bind(&data.location)
        .bind(&data.time_of_day)
        .bind(&data.description)
        .bind(data.characters.clone().map(Json))
        .bind(data.estimated_duration)
        .bind(&data.notes)
        .bind(data.props.clone().map(Json))
        .bind(id)
        .fetch_one(executor)
        .await
    }

    /// Overwrites every beat-derived column, NULLs included; `notes` and
    /// `props` are left alone.
    pub async fn replace_beat_fields<'e, E>(
        executor: E,
        id: Uuid,
        data: &CreateScene,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Scene>(
            r#"UPDATE scenes
               SET scene_number = $1,
                   order_position = COALESCE($2, order_position),
                   int_ext = $3,
                   location = $4,
                   time_of_day = $5,
                   description = $6,
                   characters = $7,
                   estimated_duration = $8,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $9
               RETURNING *"#,
        )
        .bind(data.scene_number)
        .bind(data.order_position)
        .bind(&data.int_ext)
        .bind(&data.location)
        .bind(&data.time_of_day)
        .bind(&data.description)
        .bind(Json(data.characters.clone().unwrap_or_default()))
        .bind(data.estimated_duration)
        .bind(id)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM scenes WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
