use std::collections::HashMap;

use db::models::{
    project_content::{ContentType, ProjectContent},
    scene::{CreateScene, Scene},
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{content_generator::BeatSheetScene, stages::stored_scenes};

#[derive(Debug, Error)]
pub enum SceneSyncError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("the project has no beat sheet scenes yet")]
    MissingBeatSheet,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub scenes: Vec<Scene>,
}

fn scene_fields(beat: &BeatSheetScene, number: i64, position: usize) -> CreateScene {
    CreateScene {
        scene_number: number,
        order_position: Some(position as i64),
        int_ext: beat.int_ext.clone(),
        location: beat.location.clone(),
        time_of_day: beat.day_night.clone(),
        description: beat.description.clone(),
        characters: Some(beat.characters.clone()),
        estimated_duration: beat.duration,
        notes: None,
        props: None,
    }
}

/// Mirrors the stored beat sheet into scene rows, matching on scene number.
///
/// Matched rows keep their id so their storyboards and shots survive.
pub async fn sync_scenes_from_beat_sheet(
    pool: &SqlitePool,
    project_id: Uuid,
) -> Result<SyncReport, SceneSyncError> {
    let beat_sheet = ProjectContent::find(pool, project_id, ContentType::BeatSheet)
        .await?
        .map(|content| stored_scenes(&content))
        .unwrap_or_default();
    if beat_sheet.is_empty() {
        return Err(SceneSyncError::MissingBeatSheet);
    }

    let mut tx = pool.begin().await?;

    let mut existing: HashMap<i64, Scene> = HashMap::new();
    let mut stale = Vec::new();
    for scene in Scene::find_by_project(&mut *tx, project_id).await? {
        if existing.contains_key(&scene.scene_number) {
            stale.push(scene.id);
        } else {
            existing.insert(scene.scene_number, scene);
        }
    }

    let (mut created, mut updated) = (0, 0);
    for (position, beat) in beat_sheet.iter().enumerate() {
        let number = beat.number_or(position);
        let fields = scene_fields(beat, number, position);
        match existing.remove(&number) {
            Some(scene) => {
                Scene::replace_beat_fields(&mut *tx, scene.id, &fields).await?;
                updated += 1;
            }
            None => {
                Scene::create(&mut *tx, project_id, &fields).await?;
                created += 1;
            }
        }
    }

    stale.extend(existing.into_values().map(|scene| scene.id));
    for id in &stale {
        Scene::delete(&mut *tx, *id).await?;
    }

    tx.commit().await?;

    info!(
        project_id = %project_id,
        created,
        updated,
        deleted = stale.len(),
        "Synced scenes from beat sheet"
    );

    Ok(SyncReport {
        created,
        updated,
        deleted: stale.len(),
        scenes: Scene::find_by_project(pool, project_id).await?,
    })
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            scene::UpdateScene,
            storyboard::{CreateStoryboard, Storyboard},
        },
    };
    use serde_json::json;

    use super::*;
    use crate::services::test_support;

    #[tokio::test]
    async fn missing_beat_sheet_is_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        let err = sync_scenes_from_beat_sheet(&db.pool, project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SceneSyncError::MissingBeatSheet));
    }

    async fn write_beat_sheet(pool: &SqlitePool, project_id: Uuid, scenes: serde_json::Value) {
        ProjectContent::upsert(pool, project_id, ContentType::BeatSheet, &json!({ "scenes": scenes }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resync_updates_in_place_and_drops_removed_scenes() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        write_beat_sheet(&db.pool, project.id, json!([
            {"number": 1, "intExt": "INT", "location": "HOUSE", "dayNight": "DAY", "description": "Ana waits.", "characters": ["ANA"], "duration": 2},
            {"number": 2, "intExt": "EXT", "location": "PIER", "dayNight": "NIGHT"}
        ]))
        .await;
        let first = sync_scenes_from_beat_sheet(&db.pool, project.id).await.unwrap();
        assert_eq!((first.created, first.updated, first.deleted), (2, 0, 0));
        assert_eq!(first.scenes[0].time_of_day.as_deref(), Some("DAY"));
        assert_eq!(first.scenes[0].estimated_duration, Some(2));

        let kept = first.scenes[0].id;
        Scene::update(
            &db.pool,
            kept,
            &UpdateScene {
                notes: Some("bring the red scarf".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Storyboard::create(&db.pool, kept, &CreateStoryboard::default())
            .await
            .unwrap();

        write_beat_sheet(&db.pool, project.id, json!([
            {"number": 1, "intExt": "INT", "location": "KITCHEN"},
            {"number": 3, "intExt": "EXT", "location": "BOAT", "dayNight": "DAWN"}
        ]))
        .await;
        let second = sync_scenes_from_beat_sheet(&db.pool, project.id).await.unwrap();
        assert_eq!((second.created, second.updated, second.deleted), (1, 1, 1));
        assert_eq!(
            second.scenes.iter().map(|s| s.scene_number).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(second.scenes[0].id, kept);
        let resynced = &second.scenes[0];
        assert_eq!(resynced.location.as_deref(), Some("KITCHEN"));
        // Fields the new beat sheet leaves out are cleared, hand-written notes stay.
        assert_eq!(resynced.description, None);
        assert_eq!(resynced.time_of_day, None);
        assert_eq!(resynced.estimated_duration, None);
        assert!(resynced.characters.0.is_empty());
        assert_eq!(resynced.notes.as_deref(), Some("bring the red scarf"));
        assert_eq!(Storyboard::find_by_scene(&db.pool, kept).await.unwrap().len(), 1);
    }
}
