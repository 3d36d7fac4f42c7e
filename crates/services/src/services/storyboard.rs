//! Storyboard frames and frame images generated per scene.

use std::time::Instant;

use db::models::{
    scene::Scene,
    storyboard::{CreateStoryboard, Storyboard},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    content_generator::{
        BulkReport, ContentGenerator, GeneratedText, GenerationError, JsonShape, LogScope,
        SceneBrief, log_generation,
    },
    lenient, prompts,
};

#[derive(Debug, Error)]
pub enum StoryboardError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("no scenes found, create the beat sheet first")]
    NoScenes,
}

#[derive(Debug, Deserialize)]
struct GeneratedFrame {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    camera_angle: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    camera_movement: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    image_prompt: Option<String>,
}

/// Request for a single illustrated frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct ImageFrameRequest {
    /// Defaults to a prompt composed from the scene, angle and movement.
    pub prompt: Option<String>,
    pub frame_number: Option<i64>,
    pub description: Option<String>,
    pub camera_angle: Option<String>,
    pub camera_movement: Option<String>,
}

pub struct StoryboardService {
    pool: SqlitePool,
    generator: ContentGenerator,
}

impl StoryboardService {
    pub fn new(pool: SqlitePool, generator: ContentGenerator) -> Self {
        Self { pool, generator }
    }

    /// Generates 3-5 frames for a scene, numbered after its existing frames.
    pub async fn generate_frames_for_scene(
        &self,
        scene: &Scene,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Storyboard>, StoryboardError> {
        let prompt = prompts::storyboard_frames(&SceneBrief::from(scene));
        let model = self.generator.models().fast.clone();

        let started = Instant::now();
        let result = self
            .generator
            .ask_json::<Vec<GeneratedFrame>>(&prompt, &model, JsonShape::Array)
            .await;
        let scope = LogScope {
            project_id: Some(scene.project_id),
            user_id,
        };
        log_generation(
            &self.pool,
            scope,
            "storyboard",
            &model,
            started,
            result.as_ref().map(|parsed| &parsed.raw),
        )
        .await;
        let frames = result?.value;
        if frames.is_empty() {
            return Err(GenerationError::Unparsable("no frames in answer".to_string()).into());
        }

        let mut tx = self.pool.begin().await?;
        let first_number = Storyboard::next_frame_number(&mut *tx, scene.id).await?;
        let mut created = Vec::with_capacity(frames.len());
        for (offset, frame) in frames.into_iter().enumerate() {
            let data = CreateStoryboard {
                frame_number: Some(first_number + offset as i64),
                description: frame.description,
                camera_angle: frame.camera_angle,
                camera_movement: frame.camera_movement,
                image_prompt: frame.image_prompt,
                image_url: None,
            };
            created.push(Storyboard::create(&mut *tx, scene.id, &data).await?);
        }
        tx.commit().await?;

        info!(
            scene_id = %scene.id,
            scene_number = scene.scene_number,
            frame_count = created.len(),
            "Generated storyboard frames"
        );
        Ok(created)
    }

    /// Frames for every scene of the project; a failing scene does not stop the run.
    pub async fn generate_for_project(
        &self,
        project_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<BulkReport, StoryboardError> {
        let scenes = Scene::find_by_project(&self.pool, project_id).await?;
        if scenes.is_empty() {
            return Err(StoryboardError::NoScenes);
        }

        info!(project_id = %project_id, scene_count = scenes.len(), "Generating storyboards");

        let mut report = BulkReport::new(scenes.len());
        for scene in &scenes {
            match self.generate_frames_for_scene(scene, user_id).await {
                Ok(frames) => report.record_success(frames.len()),
                Err(e) => {
                    warn!(
                        scene_id = %scene.id,
                        scene_number = scene.scene_number,
                        error = %e,
                        "Storyboard generation failed for scene"
                    );
                    report.record_failure(scene, e);
                }
            }
        }
        Ok(report)
    }

    /// Generates an image and stores it as a new frame of `scene`.
    pub async fn generate_frame_image(
        &self,
        scene: &Scene,
        request: &ImageFrameRequest,
        user_id: Option<Uuid>,
    ) -> Result<Storyboard, StoryboardError> {
        let prompt = request
            .prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| {
                prompts::storyboard_image(
                    &SceneBrief::from(scene),
                    request.camera_angle.as_deref(),
                    request.camera_movement.as_deref(),
                )
            });
        let model = self.generator.models().image.clone();

        let started = Instant::now();
        let result = self.generator.generate_image(&prompt).await;
        let logged = result.as_ref().map(|url| GeneratedText {
            content: url.clone(),
            model: model.clone(),
            tokens_used: None,
            elapsed: started.elapsed(),
        });
        let scope = LogScope {
            project_id: Some(scene.project_id),
            user_id,
        };
        log_generation(
            &self.pool,
            scope,
            "storyboard_image",
            &model,
            started,
            logged.as_ref().map_err(|e| *e),
        )
        .await;
        let image_url = result?;

        let storyboard = Storyboard::create(
            &self.pool,
            scene.id,
            &CreateStoryboard {
                frame_number: request.frame_number,
                description: request.description.clone(),
                camera_angle: request.camera_angle.clone(),
                camera_movement: request.camera_movement.clone(),
                image_prompt: Some(prompt),
                image_url: Some(image_url),
            },
        )
        .await?;

        info!(
            scene_id = %scene.id,
            frame_number = storyboard.frame_number,
            "Stored generated storyboard image"
        );
        Ok(storyboard)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use db::{
        DBService,
        models::ai_generation::{AiGeneration, GenerationOutcome},
    };

    use super::*;
    use crate::services::{
        ai_gateway::AiGatewayError,
        config::ModelSet,
        test_support::{self, ScriptedProvider},
    };

    fn service(db: &DBService, provider: Arc<ScriptedProvider>) -> StoryboardService {
        StoryboardService::new(
            db.pool.clone(),
            ContentGenerator::new(provider, ModelSet::default(), "BRL".to_string()),
        )
    }

    #[tokio::test]
    async fn frames_continue_after_existing_ones() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        let scene = test_support::scene(&db, project.id, 1, "Ana waits.").await;
        Storyboard::create(&db.pool, scene.id, &CreateStoryboard::default())
            .await
            .unwrap();
        let provider = Arc::new(ScriptedProvider::new([r#"Frames:
[{"frame_number": 1, "description": "Wide of the beach", "camera_angle": "Wide shot", "camera_movement": "Static", "image_prompt": "empty beach at night"},
 {"frame_number": 2, "description": "Ana's face", "camera_angle": "Close-up"}]"#]));

        let frames = service(&db, provider.clone())
            .generate_frames_for_scene(&scene, None)
            .await
            .unwrap();
        assert_eq!(
            frames.iter().map(|f| f.frame_number).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(frames[0].image_prompt.as_deref(), Some("empty beach at night"));
        assert_eq!(provider.requests()[0].model, "google/gemini-2.5-flash");
        assert!(provider.user_prompt(0).contains("SCENE 1 - EXT. PRAIA - NOITE"));
    }

    #[tokio::test]
    async fn concurrent_runs_on_one_scene_never_share_frame_numbers() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        let scene = test_support::scene(&db, project.id, 1, "Ana waits.").await;
        let frames = r#"[{"description": "Wide"}, {"description": "Close"}]"#;
        let service = service(&db, Arc::new(ScriptedProvider::new([frames, frames])));

        let (first, second) = tokio::join!(
            service.generate_frames_for_scene(&scene, None),
            service.generate_frames_for_scene(&scene, None)
        );
        first.unwrap();
        second.unwrap();

        let mut numbers = Storyboard::find_by_scene(&db.pool, scene.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.frame_number)
            .collect::<Vec<_>>();
        numbers.sort();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn image_frame_uses_default_prompt() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        let scene = test_support::scene(&db, project.id, 2, "Ana waits.").await;
        let provider = Arc::new(ScriptedProvider::new(["data:image/png;base64,QUJD"]));

        let frame = service(&db, provider.clone())
            .generate_frame_image(
                &scene,
                &ImageFrameRequest {
                    camera_angle: Some("Close-up".to_string()),
                    ..Default::default()
                },
                Some(project.user_id),
            )
            .await
            .unwrap();

        assert_eq!(frame.frame_number, 1);
        assert_eq!(frame.image_url.as_deref(), Some("data:image/png;base64,QUJD"));
        assert_eq!(
            frame.image_prompt.as_deref(),
            Some(
                "Scene 2: EXT. PRAIA - NOITE. Ana waits. Angle: Close-up. \
                 Professional cinematic style, striking visual composition."
            )
        );
        assert_eq!(provider.requests()[0].model, "google/gemini-2.5-flash-image-preview");
    }

    #[tokio::test]
    async fn failed_image_is_logged_and_not_stored() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        let scene = test_support::scene(&db, project.id, 1, "Ana waits.").await;
        let provider = Arc::new(ScriptedProvider::with_replies([Err(AiGatewayError::NoImage)]));

        let err = service(&db, provider)
            .generate_frame_image(
                &scene,
                &ImageFrameRequest {
                    prompt: Some("a lighthouse".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoryboardError::Generation(GenerationError::Gateway(AiGatewayError::NoImage))
        ));
        assert!(Storyboard::find_by_scene(&db.pool, scene.id).await.unwrap().is_empty());
        let log = AiGeneration::find_by_project(&db.pool, project.id, 5)
            .await
            .unwrap();
        assert_eq!(log[0].status, GenerationOutcome::Failed);
        assert_eq!(log[0].generation_type, "storyboard_image");
    }
}
