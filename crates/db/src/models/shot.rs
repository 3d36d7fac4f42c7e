use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// A row of a scene's technical breakdown.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Shot {
    pub id: Uuid,
    pub scene_id: Uuid,
    pub shot_number: Option<String>, // "3.1", "1A"
    pub shot_type: Option<String>,
    pub framing: Option<String>,
    pub movement: Option<String>,
    pub lens: Option<String>,
    #[ts(type = "Array<string>")]
    pub equipment: Json<Vec<String>>,
    pub lighting_setup: Option<String>,
    pub sound_notes: Option<String>,
    pub vfx_notes: Option<String>,
    pub notes: Option<String>,
    pub estimated_setup_time: Option<i64>, // minutes
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateShot {
    pub shot_number: Option<String>,
    pub shot_type: Option<String>,
    pub framing: Option<String>,
    pub movement: Option<String>,
    pub lens: Option<String>,
    pub equipment: Option<Vec<String>>,
    pub lighting_setup: Option<String>,
    pub sound_notes: Option<String>,
    pub vfx_notes: Option<String>,
    pub notes: Option<String>,
    pub estimated_setup_time: Option<i64>,
}

pub type UpdateShot = CreateShot;

impl Shot {
    pub async fn create<'e, E>(
        executor: E,
        scene_id: Uuid,
        data: &CreateShot,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Shot>(
            r#"INSERT INTO shots (
                   id, scene_id, shot_number, shot_type, framing, movement, lens, equipment,
                   lighting_setup, sound_notes, vfx_notes, notes, estimated_setup_time
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(scene_id)
        .bind(&data.shot_number)
        .bind(&data.shot_type)
        .bind(&data.framing)
        .bind(&data.movement)
        .bind(&data.lens)
        .bind(Json(data.equipment.clone().unwrap_or_default()))
        .bind(&data.lighting_setup)
        .bind(&data.sound_notes)
        .bind(&data.vfx_notes)
        .bind(&data.notes)
        .bind(data.estimated_setup_time)
        .fetch_one(executor)
        .await
    }

    /// Inserts all shots or none.
    pub async fn create_many(
        pool: &SqlitePool,
        scene_id: Uuid,
        shots: &[CreateShot],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(shots.len());
        for shot in shots {
            created.push(Self::create(&mut *tx, scene_id, shot).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Shot>("SELECT * FROM shots WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_scene(pool: &SqlitePool, scene_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Shot>("SELECT * FROM shots WHERE scene_id = $1 ORDER BY rowid")
            .bind(scene_id)
            .fetch_all(pool)
            .await
    }

    /// Every shot of a project, in scene order.
    pub async fn find_by_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Shot>(
            r#"SELECT shots.* FROM shots
               JOIN scenes ON scenes.id = shots.scene_id
               WHERE scenes.project_id = $1
               ORDER BY scenes.scene_number, shots.rowid"#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, id: Uuid, data: &UpdateShot) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Shot>(
            r#"UPDATE shots
               SET shot_number = COALESCE($1, shot_number),
                   shot_type = COALESCE($2, shot_type),
                   framing = COALESCE($3, framing),
                   movement = COALESCE($4, movement),
                   lens = COALESCE($5, lens),
                   equipment = COALESCE($6, equipment),
                   lighting_setup = COALESCE($7, lighting_setup),
                   sound_notes = COALESCE($8, sound_notes),
                   vfx_notes = COALESCE($9, vfx_notes),
                   notes = COALESCE($10, notes),
                   estimated_setup_time = COALESCE($11, estimated_setup_time),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $12
               RETURNING *"#,
        )
        .bind(&data.shot_number)
        .bind(&data.shot_type)
        .bind(&data.framing)
        .bind(&data.movement)
        .bind(&data.lens)
        .bind(data.equipment.clone().map(Json))
        .bind(&data.lighting_setup)
        .bind(&data.sound_notes)
        .bind(&data.vfx_notes)
        .bind(&data.notes)
        .bind(data.estimated_setup_time)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shots WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
