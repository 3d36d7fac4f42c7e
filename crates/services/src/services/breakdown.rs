//! Technical shot breakdown generated per scene.

use std::time::Instant;

use db::models::{
    scene::Scene,
    shot::{CreateShot, Shot},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    content_generator::{
        BulkReport, ContentGenerator, GenerationError, GenerationKind, JsonShape, LogScope,
        SceneBrief, log_generation,
    },
    lenient, prompts,
};

#[derive(Debug, Error)]
pub enum BreakdownError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("no scenes found, create the beat sheet first")]
    NoScenes,
}

#[derive(Debug, Deserialize)]
struct GeneratedShot {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    shot_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    shot_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    framing: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    movement: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    lens: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    equipment: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    lighting_setup: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    sound_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    vfx_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_whole_number")]
    estimated_setup_time: Option<i64>,
}

impl GeneratedShot {
    /// Shots without a number get `{scene}.{k}`.
    fn into_create(self, scene_number: i64, k: usize) -> CreateShot {
        CreateShot {
            shot_number: Some(
                self.shot_number
                    .unwrap_or_else(|| format!("{scene_number}.{k}")),
            ),
            shot_type: self.shot_type,
            framing: self.framing,
            movement: self.movement,
            lens: self.lens,
            equipment: Some(self.equipment),
            lighting_setup: self.lighting_setup,
            sound_notes: self.sound_notes,
            vfx_notes: self.vfx_notes,
            notes: self.notes,
            estimated_setup_time: self.estimated_setup_time,
        }
    }
}

pub struct BreakdownService {
    pool: SqlitePool,
    generator: ContentGenerator,
}

impl BreakdownService {
    pub fn new(pool: SqlitePool, generator: ContentGenerator) -> Self {
        Self { pool, generator }
    }

    /// Generates shots for one scene and appends them to its existing shots.
    pub async fn generate_for_scene(
        &self,
        scene: &Scene,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Shot>, BreakdownError> {
        let prompt = prompts::technical_breakdown(&SceneBrief::from(scene));
        let model = self
            .generator
            .model_for(GenerationKind::TechnicalBreakdown, false)
            .to_string();

        let started = Instant::now();
        let result = self
            .generator
            .ask_json::<Vec<GeneratedShot>>(&prompt, &model, JsonShape::Array)
            .await;
        let scope = LogScope {
            project_id: Some(scene.project_id),
            user_id,
        };
        log_generation(
            &self.pool,
            scope,
            "technical_breakdown",
            &model,
            started,
            result.as_ref().map(|parsed| &parsed.raw),
        )
        .await;
        let generated = result?.value;
        if generated.is_empty() {
            return Err(GenerationError::Unparsable("no shots in answer".to_string()).into());
        }

        let shots: Vec<CreateShot> = generated
            .into_iter()
            .enumerate()
            .map(|(i, shot)| shot.into_create(scene.scene_number, i + 1))
            .collect();
        let created = Shot::create_many(&self.pool, scene.id, &shots).await?;

        info!(
            scene_id = %scene.id,
            scene_number = scene.scene_number,
            shot_count = created.len(),
            "Generated technical breakdown"
        );
        Ok(created)
    }

    /// Runs the breakdown for every scene of the project in scene order.
    ///
    /// A failing scene is reported and the remaining scenes still run.
    pub async fn generate_for_project(
        &self,
        project_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<BulkReport, BreakdownError> {
        let scenes = Scene::find_by_project(&self.pool, project_id).await?;
        if scenes.is_empty() {
            return Err(BreakdownError::NoScenes);
        }

        info!(project_id = %project_id, scene_count = scenes.len(), "Generating technical breakdown");

        let mut report = BulkReport::new(scenes.len());
        for scene in &scenes {
            match self.generate_for_scene(scene, user_id).await {
                Ok(shots) => report.record_success(shots.len()),
                Err(e) => {
                    warn!(
                        scene_id = %scene.id,
                        scene_number = scene.scene_number,
                        error = %e,
                        "Technical breakdown failed for scene"
                    );
                    report.record_failure(scene, e);
                }
            }
        }
        Ok(report)
    }
}
