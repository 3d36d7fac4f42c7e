//! Generates a pipeline stage from the project's stored artifacts and persists it.

use std::time::Instant;

use db::models::{
    project::Project,
    project_content::{ContentType, ProjectContent},
    script::{CreateScript, Script, ScriptKind},
};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::content_generator::{
    BeatSheetContext, BeatSheetScene, ContentGenerator, GenerationContext, GenerationError,
    GenerationKind, LogScope, StorylineActs, StorylineContext, log_generation, parse_beat_sheet,
    parse_storyline,
};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{stage} cannot be generated before {missing}")]
    MissingPrerequisite {
        stage: ContentType,
        missing: ContentType,
    },
    #[error("{0} is not generated by this endpoint")]
    UnsupportedStage(ContentType),
}

/// Outcome of a stage generation.
#[derive(Debug, Clone, Serialize, TS)]
pub struct GeneratedStage {
    pub content: ProjectContent,
    /// New script version, for the script stage only.
    pub script: Option<Script>,
}

/// Acts stored under the storyline stage, if any.
pub fn stored_acts(content: &ProjectContent) -> Option<StorylineActs> {
    content
        .content
        .get("acts")
        .cloned()
        .and_then(|acts| serde_json::from_value::<StorylineActs>(acts).ok())
        .filter(|acts| !acts.is_empty())
}

/// Beat sheet scenes stored under the beat sheet stage; unreadable entries are skipped.
pub fn stored_scenes(content: &ProjectContent) -> Vec<BeatSheetScene> {
    content
        .content
        .get("scenes")
        .and_then(Value::as_array)
        .map(|scenes| {
            scenes
                .iter()
                .filter_map(|scene| serde_json::from_value(scene.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn kind_for(stage: ContentType) -> Result<GenerationKind, StageError> {
    match stage {
        ContentType::Premise => Ok(GenerationKind::Premise),
        ContentType::Argument => Ok(GenerationKind::Argument),
        ContentType::Storyline => Ok(GenerationKind::Storyline),
        ContentType::BeatSheet => Ok(GenerationKind::BeatSheet),
        ContentType::Script => Ok(GenerationKind::Script),
        other => Err(StageError::UnsupportedStage(other)),
    }
}

pub struct StageService {
    pool: SqlitePool,
    generator: ContentGenerator,
}

impl StageService {
    pub fn new(pool: SqlitePool, generator: ContentGenerator) -> Self {
        Self { pool, generator }
    }

    /// Generates `stage` for a project the caller already owns.
    pub async fn generate_stage(
        &self,
        project_id: Uuid,
        stage: ContentType,
        user_id: Option<Uuid>,
    ) -> Result<GeneratedStage, StageError> {
        let kind = kind_for(stage)?;
        let context = self.build_context(project_id, stage).await?;
        let from_script = context.script.is_some();
        let model = self.generator.model_for(kind, from_script).to_string();

        info!(
            project_id = %project_id,
            stage = %stage,
            from_script,
            "Generating stage"
        );

        let started = Instant::now();
        let result = self.generator.generate(kind, &context).await;
        let scope = LogScope {
            project_id: Some(project_id),
            user_id,
        };
        log_generation(&self.pool, scope, &kind.to_string(), &model, started, result.as_ref()).await;
        let generated = result?;

        let value = match stage {
            ContentType::Storyline => json!({ "acts": parse_storyline(&generated.content)? }),
            ContentType::BeatSheet => json!({ "scenes": parse_beat_sheet(&generated.content)? }),
            _ => json!({ "text": generated.content.trim() }),
        };

        let content = ProjectContent::upsert(&self.pool, project_id, stage, &value).await?;
        let script = if stage == ContentType::Script {
            let script = Script::create(
                &self.pool,
                project_id,
                ScriptKind::Generated,
                &CreateScript {
                    content: generated.content.trim().to_string(),
                    file_name: None,
                },
            )
            .await?;
            Some(script)
        } else {
            None
        };
        if let Err(e) = Project::touch(&self.pool, project_id).await {
            warn!(error = %e, project_id = %project_id, "Failed to touch project");
        }

        info!(
            project_id = %project_id,
            stage = %stage,
            elapsed_ms = generated.elapsed.as_millis() as u64,
            "Stage generated"
        );
        Ok(GeneratedStage { content, script })
    }

    async fn build_context(
        &self,
        project_id: Uuid,
        stage: ContentType,
    ) -> Result<GenerationContext, StageError> {
        let contents = ProjectContent::find_by_project(&self.pool, project_id).await?;
        let find = |content_type: ContentType| {
            contents
                .iter()
                .find(|c| c.content_type == content_type && c.is_filled())
        };
        let text_of = |content_type: ContentType| {
            find(content_type)
                .and_then(|c| c.text())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        };
        let missing = |missing: ContentType| StageError::MissingPrerequisite { stage, missing };

        let script = match stage {
            ContentType::Premise
            | ContentType::Argument
            | ContentType::Storyline
            | ContentType::BeatSheet => Script::latest_for_project(&self.pool, project_id)
                .await?
                .map(|s| s.content)
                .filter(|s| !s.trim().is_empty()),
            _ => None,
        };

        let mut context = GenerationContext {
            script,
            ..Default::default()
        };
        if context.script.is_some() {
            return Ok(context);
        }

        match stage {
            ContentType::Premise => {}
            ContentType::Argument => {
                context.premise = Some(text_of(ContentType::Premise).ok_or_else(|| missing(ContentType::Premise))?);
            }
            ContentType::Storyline => {
                context.premise = Some(text_of(ContentType::Premise).ok_or_else(|| missing(ContentType::Premise))?);
                context.argument =
                    Some(text_of(ContentType::Argument).ok_or_else(|| missing(ContentType::Argument))?);
            }
            ContentType::BeatSheet => {
                let acts = find(ContentType::Storyline)
                    .and_then(stored_acts)
                    .ok_or_else(|| missing(ContentType::Storyline))?;
                context.storyline = Some(StorylineContext { acts });
            }
            ContentType::Script => {
                let scenes = find(ContentType::BeatSheet)
                    .map(stored_scenes)
                    .filter(|scenes| !scenes.is_empty())
                    .ok_or_else(|| missing(ContentType::BeatSheet))?;
                context.beat_sheet = Some(BeatSheetContext { scenes });
            }
            other => return Err(StageError::UnsupportedStage(other)),
        }
        Ok(context)
    }
}
